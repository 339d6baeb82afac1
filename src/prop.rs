//! Propositions: the tuples that plans pursue and the fact store holds.
//!
//! A [`Proposition`] is an ordered tuple whose first element is its head
//! (`grasp`, `near-reachable`, `appointment`). Position `0` is the head and
//! positions `1..` are the arguments, so `prop.term(2)` is the second
//! argument. Patterns are propositions containing [`Term::Wild`] (`*`) or
//! [`Term::Var`] (`?x`) in some positions.
//!
//! The text syntax is bracketed: `[holding right-hand1 box1]`,
//! `[appointment Jim Mary cafe1 na {3600 7200}]`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;
use crate::symbol::Symbol;
use crate::time::{Ts, TsRange};

/// One element of a proposition.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Sym(Symbol),
    Num(f64),
    Prop(Proposition),
    Range(TsRange),
    /// Pattern variable; binds on first match.
    Var(Symbol),
    /// Pattern wildcard; matches anything without binding.
    Wild,
    /// Not available.
    Na,
}

static NA: Term = Term::Na;
static NA_HEAD: LazyLock<Symbol> = LazyLock::new(|| Symbol::new("na"));

impl Term {
    pub fn as_sym(&self) -> Option<&Symbol> {
        match self {
            Term::Sym(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Term::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_prop(&self) -> Option<&Proposition> {
        match self {
            Term::Prop(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_range(&self) -> Option<&TsRange> {
        match self {
            Term::Range(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_na(&self) -> bool {
        matches!(self, Term::Na)
    }
}

impl From<Symbol> for Term {
    fn from(s: Symbol) -> Self {
        Term::Sym(s)
    }
}

impl From<&Symbol> for Term {
    fn from(s: &Symbol) -> Self {
        Term::Sym(s.clone())
    }
}

/// `"*"` converts to [`Term::Wild`], so `prop!["holding", "*", "box1"]` is
/// a pattern.
impl From<&str> for Term {
    fn from(s: &str) -> Self {
        match s {
            "*" => Term::Wild,
            _ => Term::Sym(Symbol::new(s)),
        }
    }
}

impl From<f64> for Term {
    fn from(n: f64) -> Self {
        Term::Num(n)
    }
}

impl From<i64> for Term {
    fn from(n: i64) -> Self {
        Term::Num(n as f64)
    }
}

impl From<i32> for Term {
    fn from(n: i32) -> Self {
        Term::Num(f64::from(n))
    }
}

impl From<Ts> for Term {
    fn from(ts: Ts) -> Self {
        Term::Num(ts.secs() as f64)
    }
}

impl From<TsRange> for Term {
    fn from(r: TsRange) -> Self {
        Term::Range(r)
    }
}

impl From<Proposition> for Term {
    fn from(p: Proposition) -> Self {
        Term::Prop(p)
    }
}

impl From<&Proposition> for Term {
    fn from(p: &Proposition) -> Self {
        Term::Prop(p.clone())
    }
}

impl From<&Term> for Term {
    fn from(t: &Term) -> Self {
        t.clone()
    }
}

impl From<Option<Symbol>> for Term {
    fn from(s: Option<Symbol>) -> Self {
        s.map_or(Term::Na, Term::Sym)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Sym(s) => write!(f, "{s}"),
            Term::Num(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Term::Num(n) => write!(f, "{n}"),
            Term::Prop(p) => write!(f, "{p}"),
            Term::Range(r) => write!(f, "{r}"),
            Term::Var(v) => write!(f, "?{v}"),
            Term::Wild => f.write_str("*"),
            Term::Na => f.write_str("na"),
        }
    }
}

/// An ordered tuple headed by a relation or goal symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposition {
    terms: Vec<Term>,
}

/// Build a proposition from a head and arguments convertible into [`Term`].
///
/// ```
/// use tt_planner::prop;
/// let p = prop!["holding", "right-hand1", "box1"];
/// assert_eq!(p.to_string(), "[holding right-hand1 box1]");
/// ```
#[macro_export]
macro_rules! prop {
    ($head:expr $(, $arg:expr)* $(,)?) => {
        $crate::prop::Proposition::new(
            $head,
            vec![$($crate::prop::Term::from($arg)),*],
        )
    };
}

impl Proposition {
    pub fn new(head: impl Into<Symbol>, args: Vec<Term>) -> Self {
        let head: Symbol = head.into();
        let mut terms = Vec::with_capacity(args.len() + 1);
        terms.push(if head == "*" { Term::Wild } else { Term::Sym(head) });
        terms.extend(args);
        Proposition { terms }
    }

    /// A pattern whose head matches anything.
    pub fn wild_head(args: Vec<Term>) -> Self {
        let mut terms = Vec::with_capacity(args.len() + 1);
        terms.push(Term::Wild);
        terms.extend(args);
        Proposition { terms }
    }

    /// The head symbol. Wildcard heads report `na`.
    pub fn head(&self) -> &Symbol {
        match self.terms.first() {
            Some(Term::Sym(s)) => s,
            _ => &NA_HEAD,
        }
    }

    pub fn is(&self, head: &str) -> bool {
        matches!(self.terms.first(), Some(Term::Sym(s)) if s == head)
    }

    /// Term at position `i` (0 is the head). Out of range positions read as NA.
    pub fn term(&self, i: usize) -> &Term {
        self.terms.get(i).unwrap_or(&NA)
    }

    /// Symbol at position `i`, if that position holds one.
    pub fn sym(&self, i: usize) -> Option<&Symbol> {
        self.term(i).as_sym()
    }

    /// Nested proposition at position `i`.
    pub fn sub(&self, i: usize) -> Option<&Proposition> {
        self.term(i).as_prop()
    }

    pub fn num(&self, i: usize) -> Option<f64> {
        self.term(i).as_num()
    }

    pub fn range(&self, i: usize) -> Option<&TsRange> {
        self.term(i).as_range()
    }

    /// Replace the term at `i`, padding with NA when the tuple is shorter.
    pub fn set_term(&mut self, i: usize, term: Term) {
        while self.terms.len() <= i {
            self.terms.push(Term::Na);
        }
        self.terms[i] = term;
    }

    /// Number of terms including the head.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn args(&self) -> &[Term] {
        self.terms.get(1..).unwrap_or(&[])
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Whether the proposition contains no wildcards or variables.
    pub fn is_ground(&self) -> bool {
        self.terms.iter().all(|t| match t {
            Term::Wild | Term::Var(_) => false,
            Term::Prop(p) => p.is_ground(),
            _ => true,
        })
    }

    /// Unify `self` (a pattern) with `fact`, returning variable bindings.
    pub fn unify(&self, fact: &Proposition) -> Option<Bindings> {
        let mut bindings = Bindings::default();
        unify_terms(&self.terms, &fact.terms, &mut bindings).then_some(bindings)
    }

    pub fn matches(&self, fact: &Proposition) -> bool {
        self.unify(fact).is_some()
    }

    /// Replace bound variables by their values.
    pub fn substitute(&self, bindings: &Bindings) -> Proposition {
        let terms = self
            .terms
            .iter()
            .map(|t| match t {
                Term::Var(v) => bindings.get(v).cloned().unwrap_or_else(|| t.clone()),
                Term::Prop(p) => Term::Prop(p.substitute(bindings)),
                other => other.clone(),
            })
            .collect();
        Proposition { terms }
    }
}

/// Variable bindings produced by [`Proposition::unify`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings(HashMap<Symbol, Term>);

impl Bindings {
    pub fn get(&self, var: &Symbol) -> Option<&Term> {
        self.0.get(var)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn unify_terms(pattern: &[Term], fact: &[Term], bindings: &mut Bindings) -> bool {
    pattern.len() == fact.len()
        && pattern
            .iter()
            .zip(fact)
            .all(|(p, f)| unify_term(p, f, bindings))
}

fn unify_term(p: &Term, f: &Term, bindings: &mut Bindings) -> bool {
    match (p, f) {
        (Term::Wild, _) | (_, Term::Wild) => true,
        (Term::Var(v), value) => match bindings.0.get(v) {
            Some(bound) => bound == value,
            None => {
                bindings.0.insert(v.clone(), value.clone());
                true
            }
        },
        (_, Term::Var(_)) => true,
        (Term::Prop(a), Term::Prop(b)) => unify_terms(&a.terms, &b.terms, bindings),
        (a, b) => a == b,
    }
}

impl fmt::Display for Proposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, t) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{t}")?;
        }
        f.write_str("]")
    }
}

impl Serialize for Proposition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Proposition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Text syntax
// ---------------------------------------------------------------------------

impl FromStr for Proposition {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser {
            input,
            chars: input.char_indices().collect(),
            pos: 0,
        };
        parser.skip_ws();
        let prop = parser.proposition()?;
        parser.skip_ws();
        match parser.peek() {
            None => Ok(prop),
            Some((offset, found)) => Err(ParseError::Unexpected {
                input: input.to_string(),
                found,
                offset,
            }),
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<(usize, char)> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some((_, c)) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn eof(&self) -> ParseError {
        ParseError::UnexpectedEof {
            input: self.input.to_string(),
        }
    }

    fn expect(&mut self, want: char) -> Result<(), ParseError> {
        match self.peek() {
            Some((_, c)) if c == want => {
                self.pos += 1;
                Ok(())
            }
            Some((offset, found)) => Err(ParseError::Unexpected {
                input: self.input.to_string(),
                found,
                offset,
            }),
            None => Err(self.eof()),
        }
    }

    fn proposition(&mut self) -> Result<Proposition, ParseError> {
        self.expect('[')?;
        let mut terms = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some((_, ']')) => {
                    self.pos += 1;
                    break;
                }
                Some(_) => terms.push(self.term()?),
                None => return Err(self.eof()),
            }
        }
        match terms.first() {
            None => Err(ParseError::Empty {
                input: self.input.to_string(),
            }),
            Some(Term::Sym(_) | Term::Wild) => Ok(Proposition { terms }),
            Some(_) => Err(ParseError::Empty {
                input: self.input.to_string(),
            }),
        }
    }

    fn term(&mut self) -> Result<Term, ParseError> {
        match self.peek() {
            Some((_, '[')) => Ok(Term::Prop(self.proposition()?)),
            Some((_, '{')) => self.range(),
            Some(_) => {
                let atom = self.atom();
                Ok(atom_term(&atom))
            }
            None => Err(self.eof()),
        }
    }

    fn atom(&mut self) -> String {
        let mut out = String::new();
        while let Some((_, c)) = self.peek() {
            if c.is_whitespace() || matches!(c, '[' | ']' | '{' | '}') {
                break;
            }
            out.push(c);
            self.pos += 1;
        }
        out
    }

    fn range(&mut self) -> Result<Term, ParseError> {
        self.expect('{')?;
        self.skip_ws();
        let start = self.atom();
        self.skip_ws();
        let stop = self.atom();
        self.skip_ws();
        self.expect('}')?;
        let end = |text: &str| -> Result<Option<Ts>, ParseError> {
            if text == "na" {
                return Ok(None);
            }
            text.parse::<i64>()
                .map(|s| Some(Ts::from_secs(s)))
                .map_err(|_| ParseError::BadRange {
                    text: format!("{{{start} {stop}}}"),
                })
        };
        Ok(Term::Range(TsRange {
            start: end(&start)?,
            stop: end(&stop)?,
        }))
    }
}

fn atom_term(atom: &str) -> Term {
    if atom == "*" {
        return Term::Wild;
    }
    if atom == "na" {
        return Term::Na;
    }
    if let Some(var) = atom.strip_prefix('?') {
        return Term::Var(Symbol::new(var));
    }
    let numeric = atom
        .trim_start_matches('-')
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit());
    if numeric {
        if let Ok(n) = atom.parse::<f64>() {
            return Term::Num(n);
        }
    }
    Term::Sym(Symbol::new(atom))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip_text() {
        let text = "[appointment Jim Mary cafe1 [dine Jim] {3600 7200}]";
        let p: Proposition = text.parse().unwrap();
        assert_eq!(p.head(), "appointment");
        assert_eq!(p.sym(2).unwrap(), "Mary");
        assert!(p.sub(4).unwrap().is("dine"));
        assert_eq!(p.range(5).unwrap().duration(), Some(3600));
        assert_eq!(p.to_string(), text);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            "[grasp hand1".parse::<Proposition>(),
            Err(ParseError::UnexpectedEof { .. })
        ));
        assert!(matches!("[]".parse::<Proposition>(), Err(ParseError::Empty { .. })));
        assert!(matches!(
            "[a] b".parse::<Proposition>(),
            Err(ParseError::Unexpected { found: 'b', .. })
        ));
    }

    #[test]
    fn wildcard_matches_any_argument() {
        let pattern = prop!["holding", "hand1", Term::Wild];
        assert!(pattern.matches(&prop!["holding", "hand1", "box1"]));
        assert!(!pattern.matches(&prop!["holding", "hand2", "box1"]));
        assert!(!pattern.matches(&prop!["holding", "hand1"]));
    }

    #[test]
    fn variables_bind_consistently() {
        let pattern: Proposition = "[propose ?x Jim ?x]".parse().unwrap();
        assert!(pattern.matches(&"[propose Mary Jim Mary]".parse().unwrap()));
        assert!(!pattern.matches(&"[propose Mary Jim Tom]".parse().unwrap()));

        let b = pattern.unify(&"[propose Mary Jim Mary]".parse().unwrap()).unwrap();
        assert_eq!(b.get(&Symbol::new("x")), Some(&Term::from("Mary")));
        let filled = pattern.substitute(&b);
        assert!(filled.is_ground());
    }

    #[test]
    fn nested_propositions_unify() {
        let pattern: Proposition = "[propose * Jim [appointment * * * * *]]".parse().unwrap();
        let fact: Proposition = "[propose Mary Jim [appointment Mary Jim cafe1 na {0 10}]]"
            .parse()
            .unwrap();
        assert!(pattern.matches(&fact));
    }

    #[test]
    fn set_term_pads_with_na() {
        let mut p = prop!["appointment", "Jim"];
        p.set_term(3, Term::from("cafe1"));
        assert_eq!(p.len(), 4);
        assert!(p.term(2).is_na());
        assert!(p.term(10).is_na());
    }
}
