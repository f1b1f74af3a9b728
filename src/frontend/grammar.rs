//! The Grammar module loads production rules and parses token streams
//! with a table-driven LL(1) parser.
//!
//! Grammars are written as
//!
//! ```text
//! start = line ";" start | ;
//! line  = IDENTIFIER operands ;
//! ```
//!
//! one nonterminal per statement, alternatives separated by `|`. Quoted
//! names are terminals; an empty alternative derives nothing. Any symbol
//! that never appears on a left-hand side is a terminal and must be a token
//! type produced by the lexer. The nonterminal `start` is where parsing
//! begins.
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::config;
use super::error::{Error, Result};
use super::lexer::Lexicon;
use super::token::{Position, Rule, Token, TokenType, EMPTY, END_OF_INPUT, UNDEFINED};

pub const START: &str = "start";

/// Token types of the grammar description language itself.
const GRAMMAR_LEXICON: &str = r#"
IDENTIFIER  [A-Za-z_][A-Za-z0-9_]*
LITERAL     "[^"\n]*"?
=
|
;
^WHITESPACE \s+
^COMMENT    #[^\n]*
"#;

pub type SymbolSet = BTreeSet<TokenType>;

/// Receives the structural events of a parse, in derivation order.
pub trait ParseCallbacks {
    /// `rule` was used to expand the left-most unexpanded nonterminal.
    fn recv_rule(&mut self, rule: &Rule);
    /// `token` was matched against the terminal on top of the stack.
    fn recv_token(&mut self, token: &Token);
}

#[derive(Clone, Debug)]
pub struct Grammar {
    rules: Vec<Rule>,
    nonterminals: SymbolSet,
    first: BTreeMap<TokenType, SymbolSet>,
    follow: BTreeMap<TokenType, SymbolSet>,
    table: BTreeMap<TokenType, BTreeMap<TokenType, usize>>,
}

impl Grammar {
    pub fn parse(description: &str) -> Result<Grammar> {
        Grammar::from_rules(read_rules(description)?)
    }

    pub fn from_file(path: &Path) -> Result<Grammar> {
        Grammar::parse(&config::read_resource(path)?)
    }

    pub fn from_rules(rules: Vec<Rule>) -> Result<Grammar> {
        let mut grammar = Grammar {
            rules,
            nonterminals: SymbolSet::new(),
            first: BTreeMap::new(),
            follow: BTreeMap::new(),
            table: BTreeMap::new(),
        };
        grammar.rebuild()?;
        Ok(grammar)
    }

    /// Adds a production. Every derived set and the parse table are
    /// recomputed, since a new left-hand side can turn a terminal into a
    /// nonterminal.
    pub fn add_rule(&mut self, rule: Rule) -> Result<()> {
        self.rules.push(rule);
        self.rebuild()
    }

    fn rebuild(&mut self) -> Result<()> {
        if let Some(bad) = self.rules.iter().find(|r| !r.is_valid()) {
            return Err(Error::grammar(format!("invalid rule `{}`", bad)));
        }
        self.nonterminals = self.rules.iter().map(|r| r.lhs.clone()).collect();
        if !self.nonterminals.contains(START) {
            return Err(Error::grammar(format!(
                "no rule for the start symbol `{}`",
                START
            )));
        }
        self.compute_first_and_follow_sets();
        self.build_table()?;
        debug!(
            "loaded grammar with {} rules over {} nonterminals",
            self.rules.len(),
            self.nonterminals.len()
        );
        Ok(())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn nonterminals(&self) -> &SymbolSet {
        &self.nonterminals
    }

    pub fn is_nonterminal(&self, symbol: &str) -> bool {
        self.nonterminals.contains(symbol)
    }

    /// FIRST of a single symbol. A terminal is its own FIRST set.
    pub fn first(&self, symbol: &str) -> SymbolSet {
        if self.is_nonterminal(symbol) {
            self.first.get(symbol).cloned().unwrap_or_default()
        } else {
            std::iter::once(symbol.to_owned()).collect()
        }
    }

    /// FIRST of a symbol sequence. Contains `EMPTY` iff every symbol of the
    /// sequence can derive nothing, in particular for the empty sequence.
    pub fn first_of_sequence<S: AsRef<str>>(&self, symbols: &[S]) -> SymbolSet {
        let mut out = SymbolSet::new();
        for symbol in symbols {
            let first = self.first(symbol.as_ref());
            let nullable = first.contains(EMPTY);
            out.extend(first.into_iter().filter(|s| s != EMPTY));
            if !nullable {
                return out;
            }
        }
        out.insert(EMPTY.to_owned());
        out
    }

    pub fn follow(&self, symbol: &str) -> SymbolSet {
        self.follow.get(symbol).cloned().unwrap_or_default()
    }

    /// Runs the FIRST and FOLLOW fixed points. Sets only ever grow and are
    /// bounded by the terminal alphabet, so both loops terminate.
    pub fn compute_first_and_follow_sets(&mut self) {
        self.first.clear();
        self.follow.clear();

        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut changed = false;
            for rule in &self.rules {
                let first = self.first_of_sequence(&rule.rhs[..]);
                let entry = self.first.entry(rule.lhs.clone()).or_default();
                let before = entry.len();
                entry.extend(first);
                changed |= entry.len() != before;
            }
            if !changed {
                break;
            }
        }
        debug!("FIRST sets stable after {} rounds", rounds);

        self.follow
            .entry(START.to_owned())
            .or_default()
            .insert(END_OF_INPUT.to_owned());

        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut changed = false;
            for rule in &self.rules {
                for (index, symbol) in rule.rhs.iter().enumerate() {
                    if !self.is_nonterminal(symbol) {
                        continue;
                    }
                    let rest = self.first_of_sequence(&rule.rhs[index + 1..]);
                    let mut additions: SymbolSet =
                        rest.iter().filter(|s| *s != EMPTY).cloned().collect();
                    if rest.contains(EMPTY) {
                        additions.extend(self.follow(&rule.lhs));
                    }
                    let entry = self.follow.entry(symbol.clone()).or_default();
                    let before = entry.len();
                    entry.extend(additions);
                    changed |= entry.len() != before;
                }
            }
            if !changed {
                break;
            }
        }
        debug!("FOLLOW sets stable after {} rounds", rounds);
    }

    fn build_table(&mut self) -> Result<()> {
        let mut table: BTreeMap<TokenType, BTreeMap<TokenType, usize>> = BTreeMap::new();
        for (index, rule) in self.rules.iter().enumerate() {
            let first = self.first_of_sequence(&rule.rhs[..]);
            let mut lookaheads: SymbolSet =
                first.iter().filter(|s| *s != EMPTY).cloned().collect();
            if first.contains(EMPTY) {
                lookaheads.extend(self.follow(&rule.lhs));
            }

            let row = table.entry(rule.lhs.clone()).or_default();
            for terminal in lookaheads {
                if let Some(&other) = row.get(&terminal) {
                    if other != index {
                        return Err(Error::grammar(format!(
                            "not LL(1): `{}` and `{}` both apply on `{}`",
                            self.rules[other], rule, terminal
                        )));
                    }
                }
                row.insert(terminal, index);
            }
        }
        self.table = table;
        Ok(())
    }

    /// The rule that expands `nonterminal` when `lookahead` is next.
    pub fn rule_for(&self, nonterminal: &str, lookahead: &str) -> Option<&Rule> {
        let index = *self.table.get(nonterminal)?.get(lookahead)?;
        self.rules.get(index)
    }

    /// Parses `tokens` (without an end marker) and reports every expansion
    /// and every matched token to `callbacks`.
    pub fn parse_tokens<C: ParseCallbacks>(&self, tokens: &[Token], callbacks: &mut C) -> Result<()> {
        let end = Token::end_of_input(
            tokens
                .last()
                .map(|t| Position::new(t.position.line, t.position.column + t.lexeme.chars().count()))
                .unwrap_or_else(|| Position::new(1, 1)),
        );
        let mut position = 0;
        let mut stack: Vec<&str> = vec![END_OF_INPUT, START];

        while let Some(top) = stack.pop() {
            let lookahead = tokens.get(position).unwrap_or(&end);
            trace!("stack top `{}`, lookahead {}", top, lookahead);

            if top == EMPTY {
                continue;
            }

            if self.is_nonterminal(top) {
                let rule = match self.rule_for(top, &lookahead.kind) {
                    Some(rule) => rule,
                    None => {
                        return Err(Error::syntax(
                            Some(lookahead.position),
                            &lookahead.lexeme,
                            format!("unexpected {} while reading `{}`", describe(lookahead), top),
                        ))
                    }
                };
                callbacks.recv_rule(rule);
                stack.extend(rule.rhs.iter().rev().map(|s| s.as_str()));
            } else if top == END_OF_INPUT {
                if lookahead.is_end_of_input() {
                    return Ok(());
                }
                return Err(Error::syntax(
                    Some(lookahead.position),
                    &lookahead.lexeme,
                    format!("expected end of input, found {}", describe(lookahead)),
                ));
            } else if top == lookahead.kind {
                callbacks.recv_token(lookahead);
                position += 1;
            } else {
                return Err(Error::syntax(
                    Some(lookahead.position),
                    &lookahead.lexeme,
                    format!("expected `{}`, found {}", top, describe(lookahead)),
                ));
            }
        }

        Err(Error::syntax(
            Some(end.position),
            "",
            "parse stack exhausted before end of input",
        ))
    }
}

/// Loads a grammar description.
pub fn read_grammar(description: &str) -> Result<Grammar> {
    Grammar::parse(description)
}

fn describe(token: &Token) -> String {
    if token.is_end_of_input() {
        "end of input".to_owned()
    } else {
        format!("{} `{}`", token.kind, token.lexeme)
    }
}

/// The grammar description is flat enough to read without a parser:
/// `IDENTIFIER =` opens a statement, then symbols up to `|` or `;`.
fn read_rules(description: &str) -> Result<Vec<Rule>> {
    let lexicon = Lexicon::parse(GRAMMAR_LEXICON)?;
    let tokens = lexicon.tokenize(description)?;

    let mut rules: Vec<Rule> = Vec::new();
    let mut lhs: TokenType = UNDEFINED.to_owned();
    let mut rhs: Vec<TokenType> = Vec::new();
    let mut reading_rule = false;

    for token in tokens {
        let misplaced = |context: &str| {
            Error::grammar(format!(
                "unexpected {} `{}` at {} {}",
                token.kind, token.lexeme, token.position, context
            ))
        };

        if reading_rule {
            match token.kind.as_str() {
                "IDENTIFIER" => rhs.push(token.lexeme.clone()),
                "LITERAL" => rhs.push(unquote(&token)?),
                "|" | ";" => {
                    let rule = Rule::new(lhs.clone(), std::mem::take(&mut rhs));
                    if !rule.is_valid() {
                        return Err(Error::grammar(format!("invalid rule `{}`", rule)));
                    }
                    rules.push(rule);
                    if token.kind == ";" {
                        lhs = UNDEFINED.to_owned();
                        reading_rule = false;
                    }
                }
                _ => return Err(misplaced(&format!("in a rule for `{}`", lhs))),
            }
        } else {
            match token.kind.as_str() {
                "IDENTIFIER" if lhs == UNDEFINED => lhs = token.lexeme.clone(),
                "=" if lhs != UNDEFINED => reading_rule = true,
                _ => return Err(misplaced("where a nonterminal was expected")),
            }
        }
    }

    if reading_rule || lhs != UNDEFINED {
        return Err(Error::grammar(format!(
            "rule for `{}` is missing its terminating `;`",
            lhs
        )));
    }
    Ok(rules)
}

fn unquote(token: &Token) -> Result<TokenType> {
    let inner = token
        .lexeme
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .filter(|s| !s.is_empty());
    match inner {
        Some(inner) => Ok(inner.to_owned()),
        None => Err(Error::grammar(format!(
            "malformed literal {} at {}",
            token.lexeme, token.position
        ))),
    }
}
