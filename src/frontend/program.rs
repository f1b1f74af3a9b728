//! Turns qes source into a `Program`.
//!
//! The source is lexed, parsed into a `ParseTree`, and then evaluated
//! bottom-up. Each grammar symbol the language cares about has an
//! `Action` that builds its node's payload from its children's payloads.
//!
//! Labels are resolved with placeholders. An identifier cannot be told
//! apart from a label reference when it is read, so every identifier is
//! given a large negative integer unique to its name. Evaluation visits the
//! program from its last instruction to its first, so instructions are
//! numbered with a counter that starts at zero and decreases: the last
//! instruction gets -1, and once everything is numbered the counter holds
//! minus the program length. A last pass over the finished program swaps
//! every placeholder for the offset from the referencing instruction to
//! the label it names.
use std::collections::{HashMap, VecDeque};
use std::convert::TryFrom;

use super::config::Config;
use super::error::{Error, Result};
use super::eval::evaluate_bottom_up;
use super::grammar::{Grammar, START};
use super::instruction::{Instruction, Program, Value};
use super::lexer::Lexicon;
use super::token::{Position, Token, EMPTY};
use super::tree::{NodeId, ParseTree, ROOT};

/// Placeholders are `-(n << PLACEHOLDER_SHIFT)`; literals and program
/// counters stay below `1 << PLACEHOLDER_SHIFT` in magnitude.
pub const PLACEHOLDER_SHIFT: u32 = 48;
const LITERAL_LIMIT: i64 = 1 << PLACEHOLDER_SHIFT;
const MAX_IDENTIFIERS: i64 = (1 << (63 - PLACEHOLDER_SHIFT)) - 1;
/// Longest program, in instructions, after every `repeat` is unrolled.
pub const MAX_PROGRAM_LEN: i64 = 1 << 24;

const KW_REPEAT: &str = "KW_repeat";
const KW_ANNOTATION: &str = "KW_annotation";
const KW_PROPERTY: &str = "KW_property";

/// Label bookkeeping for one program. A fresh context is made for every
/// call to `read_program`, so nothing leaks between programs.
#[derive(Clone, Debug, Default)]
pub struct ResolutionContext {
    placeholders: HashMap<String, i64>,
    names: HashMap<i64, String>,
    first_use: HashMap<i64, Position>,
    // Placeholder of a defined label -> counter value of its instruction.
    labels: HashMap<i64, i64>,
    counter: i64,
}

impl ResolutionContext {
    pub fn new() -> Self {
        ResolutionContext::default()
    }

    /// The placeholder standing for `name`. The same name always gets the
    /// same placeholder.
    pub fn reference(&mut self, name: &str, position: Option<Position>) -> Result<i64> {
        if let Some(&placeholder) = self.placeholders.get(name) {
            // Evaluation runs backwards, so keep the earliest position seen.
            if let Some(position) = position {
                let first = self.first_use.entry(placeholder).or_insert(position);
                *first = (*first).min(position);
            }
            return Ok(placeholder);
        }
        let n = self.placeholders.len() as i64 + 1;
        if n > MAX_IDENTIFIERS {
            return Err(Error::syntax(position, name, "too many distinct identifiers"));
        }
        let placeholder = -(n << PLACEHOLDER_SHIFT);
        self.placeholders.insert(name.to_owned(), placeholder);
        self.names.insert(placeholder, name.to_owned());
        if let Some(position) = position {
            self.first_use.insert(placeholder, position);
        }
        Ok(placeholder)
    }

    pub fn is_placeholder(&self, value: i64) -> bool {
        self.names.contains_key(&value)
    }

    /// Marks `name` as the label of the instruction numbered `pc`.
    pub fn define(&mut self, name: &str, pc: i64, position: Option<Position>) -> Result<()> {
        let placeholder = self.reference(name, position)?;
        if self.labels.contains_key(&placeholder) {
            return Err(Error::syntax(
                position,
                name,
                format!("label `{}` is defined more than once", name),
            ));
        }
        trace!("label {} at counter {}", name, pc);
        self.labels.insert(placeholder, pc);
        Ok(())
    }

    /// Numbers the next instruction, counting back from the end.
    pub fn place(&mut self) -> Result<i64> {
        if self.counter <= -MAX_PROGRAM_LEN {
            return Err(Error::syntax(None, "", "program is too long"));
        }
        self.counter -= 1;
        Ok(self.counter)
    }

    pub fn counter(&self) -> i64 {
        self.counter
    }

    /// Unrolls a `repeat` block whose instructions were the last ones
    /// placed.
    ///
    /// References between instructions of the block are resolved here,
    /// once per copy, so every copy jumps within itself. The block's labels
    /// then move to the first copy, which is what references from outside
    /// the block see. Repeating zero times drops the block and its labels.
    pub fn expand_repeat(
        &mut self,
        mut block: VecDeque<Instruction>,
        times: usize,
    ) -> Result<VecDeque<Instruction>> {
        let len = block.len() as i64;
        let lo = self.counter;
        let span = lo..lo + len;

        let local: HashMap<i64, i64> = self
            .labels
            .iter()
            .filter(|(_, pc)| span.contains(*pc))
            .map(|(&placeholder, &pc)| (placeholder, pc))
            .collect();
        for (i, instruction) in block.iter_mut().enumerate() {
            let here = lo + i as i64;
            for value in instruction.values_mut() {
                if let Value::Int(v) = *value {
                    if let Some(&pc) = local.get(&v) {
                        *value = Value::Int(pc - here);
                    }
                }
            }
        }

        if times == 0 {
            self.labels.retain(|_, pc| !span.contains(&*pc));
            self.counter += len;
            return Ok(VecDeque::new());
        }

        let too_long = || Error::syntax(None, "", "repeated block makes the program too long");
        let extra = i64::try_from(times - 1)
            .ok()
            .and_then(|t| t.checked_mul(len))
            .ok_or_else(too_long)?;
        self.counter = self
            .counter
            .checked_sub(extra)
            .filter(|counter| *counter >= -MAX_PROGRAM_LEN)
            .ok_or_else(too_long)?;
        for pc in self.labels.values_mut() {
            if span.contains(&*pc) {
                *pc -= extra;
            }
        }

        let mut out = VecDeque::new();
        for _ in 0..times {
            out.extend(block.iter().cloned());
        }
        Ok(out)
    }

    /// Replaces every placeholder in `program` with the signed distance
    /// from its instruction to the labelled one.
    pub fn resolve(&self, program: &mut Program) -> Result<()> {
        let end = self.counter;
        debug_assert_eq!(end, -(program.len() as i64));
        for (index, instruction) in program.iter_mut().enumerate() {
            for value in instruction.values_mut() {
                let placeholder = match *value {
                    Value::Int(v) if self.is_placeholder(v) => v,
                    _ => continue,
                };
                let pc = match self.labels.get(&placeholder) {
                    Some(pc) => *pc,
                    None => return Err(self.dangling(placeholder)),
                };
                *value = Value::Int(pc - end - index as i64);
            }
        }
        Ok(())
    }

    fn dangling(&self, placeholder: i64) -> Error {
        let name = self.names.get(&placeholder).map(String::as_str).unwrap_or("");
        Error::syntax(
            self.first_use.get(&placeholder).copied(),
            name,
            format!("label `{}` is never defined", name),
        )
    }
}

#[derive(Clone, PartialEq, Debug)]
enum Modifier {
    Annotation(String),
    Property(String, Value),
}

/// What evaluation has built for a node so far.
#[derive(Clone, PartialEq, Debug)]
enum Payload {
    Unset,
    Word { text: String, placeholder: i64 },
    Value(Value),
    Operands(VecDeque<Value>),
    Instruction(Instruction),
    Line { instruction: Instruction, pc: i64 },
    Modifier(Modifier),
    Block(VecDeque<Instruction>),
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Unset
    }
}

impl Payload {
    fn kind(&self) -> &'static str {
        match self {
            Payload::Unset => "nothing",
            Payload::Word { .. } => "a word",
            Payload::Value(_) => "a value",
            Payload::Operands(_) => "operands",
            Payload::Instruction(_) => "an instruction",
            Payload::Line { .. } => "a line",
            Payload::Modifier(_) => "a modifier",
            Payload::Block(_) => "a block",
        }
    }

    fn unexpected(&self, wanted: &str) -> Error {
        Error::grammar(format!("expected {} in the parse tree, found {}", wanted, self.kind()))
    }

    fn into_word(self) -> Result<(String, i64)> {
        match self {
            Payload::Word { text, placeholder } => Ok((text, placeholder)),
            other => Err(other.unexpected("a word")),
        }
    }

    fn into_value(self) -> Result<Value> {
        match self {
            Payload::Value(value) => Ok(value),
            other => Err(other.unexpected("a value")),
        }
    }

    fn into_operands(self) -> Result<VecDeque<Value>> {
        match self {
            Payload::Operands(operands) => Ok(operands),
            other => Err(other.unexpected("operands")),
        }
    }

    fn into_instruction(self) -> Result<Instruction> {
        match self {
            Payload::Instruction(instruction) => Ok(instruction),
            other => Err(other.unexpected("an instruction")),
        }
    }

    fn into_line(self) -> Result<(Instruction, i64)> {
        match self {
            Payload::Line { instruction, pc } => Ok((instruction, pc)),
            other => Err(other.unexpected("a line")),
        }
    }

    fn into_modifier(self) -> Result<Modifier> {
        match self {
            Payload::Modifier(modifier) => Ok(modifier),
            other => Err(other.unexpected("a modifier")),
        }
    }

    fn into_block(self) -> Result<VecDeque<Instruction>> {
        match self {
            Payload::Block(block) => Ok(block),
            other => Err(other.unexpected("a block")),
        }
    }
}

type Tree = ParseTree<Payload>;

/// The `nth` child of `id` labelled `symbol`.
fn child(tree: &Tree, id: NodeId, symbol: &str, nth: usize) -> Result<NodeId> {
    tree.children(id)
        .iter()
        .copied()
        .filter(|&c| tree.symbol(c) == symbol)
        .nth(nth)
        .ok_or_else(|| {
            Error::grammar(format!(
                "`{}` node is missing a `{}` child",
                tree.symbol(id),
                symbol
            ))
        })
}

fn has_child(tree: &Tree, id: NodeId, symbol: &str) -> bool {
    tree.children(id).iter().any(|&c| tree.symbol(c) == symbol)
}

fn take(tree: &mut Tree, id: NodeId, symbol: &str, nth: usize) -> Result<Payload> {
    let c = child(tree, id, symbol, nth)?;
    Ok(tree.take_payload(c))
}

/// Semantic actions, one per grammar symbol that carries meaning.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Action {
    Root,
    Start,
    Line,
    Instruction,
    Operands,
    Modifier,
    AnyVal,
    Identifier,
    Label,
    IntLiteral,
    FloatLiteral,
    StringLiteral,
}

impl Action {
    fn for_symbol(symbol: &str) -> Option<Action> {
        let action = match symbol {
            ROOT => Action::Root,
            START => Action::Start,
            "line" => Action::Line,
            "instruction" => Action::Instruction,
            "operands" | "more_operands" => Action::Operands,
            "modifier" => Action::Modifier,
            "anyval" => Action::AnyVal,
            "IDENTIFIER" => Action::Identifier,
            "LABEL" => Action::Label,
            "I_LITERAL" => Action::IntLiteral,
            "F_LITERAL" => Action::FloatLiteral,
            "S_LITERAL" => Action::StringLiteral,
            _ => return None,
        };
        Some(action)
    }

    fn apply(self, tree: &mut Tree, id: NodeId, ctx: &mut ResolutionContext) -> Result<()> {
        let position = tree.position(id);
        let raw = tree.raw(id).unwrap_or("").to_owned();

        let payload = match self {
            Action::Identifier => Payload::Word {
                placeholder: ctx.reference(&raw, position)?,
                text: raw,
            },
            Action::Label => {
                let name = raw.strip_suffix(':').unwrap_or(&raw);
                Payload::Word {
                    placeholder: ctx.reference(name, position)?,
                    text: name.to_owned(),
                }
            }
            Action::IntLiteral => {
                let value = raw
                    .parse::<i64>()
                    .ok()
                    .filter(|v| *v < LITERAL_LIMIT)
                    .ok_or_else(|| Error::syntax(position, &raw, "integer literal out of range"))?;
                Payload::Value(Value::Int(value))
            }
            Action::FloatLiteral => {
                let value = raw
                    .parse::<f64>()
                    .map_err(|_| Error::syntax(position, &raw, "malformed float literal"))?;
                Payload::Value(Value::Float(value))
            }
            Action::StringLiteral => {
                let inner = raw
                    .strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .ok_or_else(|| Error::syntax(position, &raw, "unterminated string literal"))?;
                Payload::Value(Value::Str(inner.to_owned()))
            }
            Action::AnyVal => {
                let c = match tree.children(id).first().copied() {
                    Some(c) => c,
                    None => return Err(Error::grammar("`anyval` node has no children")),
                };
                match tree.take_payload(c) {
                    Payload::Word { placeholder, .. } => Payload::Value(Value::Int(placeholder)),
                    other => Payload::Value(other.into_value()?),
                }
            }
            Action::Operands => {
                if has_child(tree, id, "anyval") {
                    let value = take(tree, id, "anyval", 0)?.into_value()?;
                    let mut rest = take(tree, id, "more_operands", 0)?.into_operands()?;
                    rest.push_front(value);
                    Payload::Operands(rest)
                } else {
                    Payload::Operands(VecDeque::new())
                }
            }
            Action::Instruction => {
                let (name, _) = take(tree, id, "IDENTIFIER", 0)?.into_word()?;
                let operands = take(tree, id, "operands", 0)?.into_operands()?;
                Payload::Instruction(Instruction::new(name, operands.into()))
            }
            Action::Modifier => {
                let (name, _) = take(tree, id, "IDENTIFIER", 0)?.into_word()?;
                if has_child(tree, id, KW_PROPERTY) {
                    let value = take(tree, id, "anyval", 0)?.into_value()?;
                    Payload::Modifier(Modifier::Property(name, value))
                } else if has_child(tree, id, KW_ANNOTATION) {
                    Payload::Modifier(Modifier::Annotation(name))
                } else {
                    return Err(Error::grammar("`modifier` node is neither an annotation nor a property"));
                }
            }
            Action::Line => {
                if has_child(tree, id, "instruction") {
                    let instruction = take(tree, id, "instruction", 0)?.into_instruction()?;
                    let pc = ctx.place()?;
                    Payload::Line { instruction, pc }
                } else if has_child(tree, id, "modifier") {
                    let modifier = take(tree, id, "modifier", 0)?.into_modifier()?;
                    let (mut instruction, pc) = take(tree, id, "line", 0)?.into_line()?;
                    match modifier {
                        Modifier::Annotation(name) => instruction.put_annotation(name),
                        Modifier::Property(key, value) => instruction.put_property(key, value),
                    }
                    Payload::Line { instruction, pc }
                } else {
                    let label = child(tree, id, "LABEL", 0)?;
                    let label_position = tree.position(label);
                    let (name, _) = tree.take_payload(label).into_word()?;
                    let (instruction, pc) = take(tree, id, "line", 0)?.into_line()?;
                    ctx.define(&name, pc, label_position)?;
                    Payload::Line { instruction, pc }
                }
            }
            Action::Start => {
                if has_child(tree, id, "line") {
                    let (instruction, _) = take(tree, id, "line", 0)?.into_line()?;
                    let mut block = take(tree, id, START, 0)?.into_block()?;
                    block.push_front(instruction);
                    Payload::Block(block)
                } else if has_child(tree, id, KW_REPEAT) {
                    let count = child(tree, id, "I_LITERAL", 0)?;
                    let count_position = tree.position(count);
                    let times = tree
                        .take_payload(count)
                        .into_value()?
                        .as_integer()
                        .ok()
                        .and_then(|n| usize::try_from(n).ok())
                        .ok_or_else(|| Error::syntax(count_position, "", "bad repeat count"))?;
                    let inner = take(tree, id, START, 0)?.into_block()?;
                    let tail = take(tree, id, START, 1)?.into_block()?;
                    debug!("repeating a block of {} instructions {} times", inner.len(), times);
                    let mut block = ctx.expand_repeat(inner, times)?;
                    block.extend(tail);
                    Payload::Block(block)
                } else if has_child(tree, id, EMPTY) {
                    Payload::Block(VecDeque::new())
                } else {
                    return Err(Error::grammar("`start` node has an unknown shape"));
                }
            }
            Action::Root => match tree.children(id).first().copied() {
                Some(c) => Payload::Block(tree.take_payload(c).into_block()?),
                None => Payload::Block(VecDeque::new()),
            },
        };

        *tree.payload_mut(id) = payload;
        Ok(())
    }
}

/// A loaded lexicon and grammar, reusable for any number of programs.
#[derive(Clone, Debug)]
pub struct Frontend {
    lexicon: Lexicon,
    grammar: Grammar,
}

impl Frontend {
    pub fn new(config: &Config) -> Result<Frontend> {
        let lexicon = Lexicon::parse(&config.lexicon_text()?)?;
        let grammar = Grammar::parse(&config.grammar_text()?)?;
        info!("front end ready (lexicon: {:?}, grammar: {:?})", config.lexicon, config.grammar);
        Ok(Frontend { lexicon, grammar })
    }

    /// The qes language as shipped.
    pub fn builtin() -> Result<Frontend> {
        Frontend::new(&Config::default())
    }

    /// Lexicon and grammar files named by `QES_LEXER_FILE` and
    /// `QES_LL_GRAMMAR_FILE`.
    pub fn from_env() -> Result<Frontend> {
        Frontend::new(&Config::from_env()?)
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>> {
        self.lexicon.tokenize(source)
    }

    pub fn read_program(&self, source: &str) -> Result<Program> {
        let tokens = self.tokenize(source)?;
        debug!("lexed {} tokens", tokens.len());

        let mut tree: Tree = ParseTree::new();
        self.grammar.parse_tokens(&tokens, &mut tree)?;
        debug!("parse tree has {} nodes", tree.len());

        let mut ctx = ResolutionContext::new();
        evaluate_bottom_up(&mut tree, |tree, id| {
            let action = Action::for_symbol(tree.symbol(id));
            match action {
                Some(action) => action.apply(tree, id, &mut ctx),
                None => Ok(()),
            }
        })?;

        let root = tree.root();
        let mut program: Program = tree.take_payload(root).into_block()?.into();
        ctx.resolve(&mut program)?;
        debug!("assembled {} instructions", program.len());
        Ok(program)
    }
}

/// Reads a program with the lexicon and grammar named by the environment,
/// falling back to the built-in ones.
pub fn read_program(source: &str) -> Result<Program> {
    Frontend::new(&Config::resolve(None, None))?.read_program(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(source: &str) -> Result<Program> {
        Frontend::builtin().unwrap().read_program(source)
    }

    fn names(program: &Program) -> Vec<&str> {
        program.iter().map(|i| i.name()).collect()
    }

    fn offset(program: &Program, index: usize) -> i64 {
        program[index].get(0).unwrap().as_integer().unwrap()
    }

    #[test]
    fn test_empty_program() {
        assert!(read("").unwrap().is_empty());
        assert!(read("  # nothing here\n").unwrap().is_empty());
    }

    #[test]
    fn test_operands() {
        let program = read("op 1, 2.5, \"text\";\nnop;").unwrap();
        assert_eq!(names(&program), vec!["op", "nop"]);
        assert_eq!(
            program[0].operands(),
            &[Value::Int(1), Value::Float(2.5), Value::from("text")]
        );
        assert!(program[1].operands().is_empty());
    }

    #[test]
    fn test_modifiers() {
        let program = read("@annotation uncomputed @property timeout 2.5 h 0;").unwrap();
        assert_eq!(program.len(), 1);
        let h = &program[0];
        assert_eq!(h.name(), "h");
        assert!(h.has_annotation("uncomputed"));
        assert_eq!(h.property("timeout"), Some(&Value::Float(2.5)));
        assert_eq!(h.operands(), &[Value::Int(0)]);
    }

    #[test]
    fn test_backward_label() {
        let program = read("FOO: nop; jmp FOO;").unwrap();
        assert_eq!(names(&program), vec!["nop", "jmp"]);
        assert_eq!(offset(&program, 1), -1);
    }

    #[test]
    fn test_forward_label() {
        let program = read("jmp FOO; FOO: nop;").unwrap();
        assert_eq!(names(&program), vec!["jmp", "nop"]);
        assert_eq!(offset(&program, 0), 1);
    }

    #[test]
    fn test_label_offsets_in_longer_program() {
        let program = read("a; START: b; c; jmp START; jmp END; d; END: e;").unwrap();
        assert_eq!(offset(&program, 3), -2);
        assert_eq!(offset(&program, 4), 2);
    }

    #[test]
    fn test_self_reference_and_multiple_labels() {
        let program = read("HERE: THERE: spin HERE, THERE;").unwrap();
        assert_eq!(program[0].operands(), &[Value::Int(0), Value::Int(0)]);
    }

    #[test]
    fn test_property_label() {
        let program = read("nop; @property target DONE wait; DONE: halt;").unwrap();
        assert_eq!(program[1].property("target"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_repeat() {
        let program = read("repeat(3) { nop; }").unwrap();
        assert_eq!(names(&program), vec!["nop", "nop", "nop"]);
    }

    #[test]
    fn test_repeat_between_instructions() {
        let program = read("a; repeat(2) { b; c; } d;").unwrap();
        assert_eq!(names(&program), vec!["a", "b", "c", "b", "c", "d"]);
    }

    #[test]
    fn test_labels_inside_repeat_stay_local() {
        let program = read("repeat(2) { TOP: h 0; jmp TOP; }").unwrap();
        assert_eq!(names(&program), vec!["h", "jmp", "h", "jmp"]);
        assert_eq!(offset(&program, 1), -1);
        assert_eq!(offset(&program, 3), -1);
    }

    #[test]
    fn test_labels_around_repeat() {
        let source = "jmp BODY; repeat(3) { BODY: x; jmp OUT; } OUT: y; jmp BODY;";
        let program = read(source).unwrap();
        assert_eq!(names(&program), vec!["jmp", "x", "jmp", "x", "jmp", "x", "jmp", "y", "jmp"]);
        // Outside references land on the first copy.
        assert_eq!(offset(&program, 0), 1);
        assert_eq!(offset(&program, 8), -7);
        // Each copy's forward jump is relative to itself.
        assert_eq!(offset(&program, 2), 5);
        assert_eq!(offset(&program, 4), 3);
        assert_eq!(offset(&program, 6), 1);
    }

    #[test]
    fn test_nested_repeat() {
        let program = read("repeat(2) { a; repeat(2) { b; } }").unwrap();
        assert_eq!(names(&program), vec!["a", "b", "b", "a", "b", "b"]);
    }

    #[test]
    fn test_repeat_zero() {
        let program = read("a; repeat(0) { b; c; } d; jmp START; START: e;").unwrap();
        assert_eq!(names(&program), vec!["a", "d", "jmp", "e"]);
        assert_eq!(offset(&program, 2), 1);

        match read("repeat(0) { GONE: b; } jmp GONE;") {
            Err(Error::Syntax { lexeme, .. }) => assert_eq!(lexeme, "GONE"),
            other => panic!("expected dangling label, got {:?}", other),
        }
    }

    #[test]
    fn test_dangling_label() {
        match read("nop; jmp NOWHERE;") {
            Err(Error::Syntax {
                lexeme, position, ..
            }) => {
                assert_eq!(lexeme, "NOWHERE");
                assert_eq!(position, Some(Position::new(1, 10)));
            }
            other => panic!("expected dangling label, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_label() {
        match read("A: nop; A: nop;") {
            Err(Error::Syntax { lexeme, .. }) => assert_eq!(lexeme, "A"),
            other => panic!("expected duplicate label, got {:?}", other),
        }
    }

    #[test]
    fn test_fatal_errors_are_distinguishable() {
        assert!(matches!(read("nop $;"), Err(Error::Lex { .. })));
        assert!(matches!(read("nop 1 2;"), Err(Error::Syntax { .. })));
        assert!(matches!(read("nop"), Err(Error::Syntax { .. })));
        assert!(matches!(read("op \"open;"), Err(Error::Syntax { .. })));
        assert!(matches!(read("op 281474976710656;"), Err(Error::Syntax { .. })));
    }

    #[test]
    fn test_contexts_are_independent() {
        let frontend = Frontend::builtin().unwrap();
        assert!(frontend.read_program("A: nop; jmp A;").is_ok());
        // A second program may reuse the label and must not see the first one.
        assert!(frontend.read_program("A: nop; jmp A;").is_ok());
        assert!(frontend.read_program("jmp A;").is_err());
    }

    #[test]
    fn test_placeholders() {
        let mut ctx = ResolutionContext::new();
        let a = ctx.reference("a", None).unwrap();
        let b = ctx.reference("b", None).unwrap();
        assert_eq!(ctx.reference("a", None).unwrap(), a);
        assert_ne!(a, b);
        assert_eq!(a, -(1 << PLACEHOLDER_SHIFT));
        assert!(ctx.is_placeholder(b));
        assert!(!ctx.is_placeholder(-1));
    }

    #[test]
    fn test_counter_counts_down() {
        let mut ctx = ResolutionContext::new();
        assert_eq!(ctx.place().unwrap(), -1);
        assert_eq!(ctx.place().unwrap(), -2);
        assert_eq!(ctx.counter(), -2);
    }

    fn syntax_message(result: Result<Program>) -> String {
        match result {
            Err(Error::Syntax { message, .. }) => message,
            other => panic!("expected a syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_dangling_label_points_at_first_use() {
        match read("jmp NOWHERE;\njmp NOWHERE;") {
            Err(Error::Syntax { position, .. }) => assert_eq!(position, Some(Position::new(1, 5))),
            other => panic!("expected dangling label, got {:?}", other),
        }
    }

    #[test]
    fn test_huge_repeat_is_an_error() {
        let source = format!("repeat(281466387038201) {{ {} }}", "nop;".repeat(32769));
        assert!(syntax_message(read(&source)).contains("too long"));
        assert!(syntax_message(read("repeat(100000000000) { nop; }")).contains("too long"));
        assert!(syntax_message(read("repeat(281474976710655) { a; b; }")).contains("too long"));
    }

    #[test]
    fn test_repeat_up_to_the_limit() {
        let mut ctx = ResolutionContext::new();
        ctx.place().unwrap();
        let block: VecDeque<Instruction> = vec![Instruction::new("nop", vec![])].into();
        assert!(ctx.expand_repeat(block.clone(), MAX_PROGRAM_LEN as usize + 1).is_err());
        assert_eq!(ctx.counter(), -1);

        let mut ctx = ResolutionContext::new();
        ctx.counter = -MAX_PROGRAM_LEN + 2;
        ctx.place().unwrap();
        assert_eq!(ctx.expand_repeat(block, 2).unwrap().len(), 2);
        assert_eq!(ctx.counter(), -MAX_PROGRAM_LEN);
    }

    #[test]
    fn test_program_too_long() {
        let mut ctx = ResolutionContext::new();
        ctx.counter = -MAX_PROGRAM_LEN + 1;
        assert_eq!(ctx.place().unwrap(), -MAX_PROGRAM_LEN);
        match ctx.place() {
            Err(Error::Syntax { message, .. }) => assert_eq!(message, "program is too long"),
            other => panic!("expected an error, got {:?}", other),
        }
    }

    #[test]
    fn test_too_many_identifiers() {
        let mut ctx = ResolutionContext::new();
        for n in 0..MAX_IDENTIFIERS {
            ctx.reference(&format!("id{}", n), None).unwrap();
        }
        // Known names still resolve.
        assert!(ctx.reference("id0", None).is_ok());
        match ctx.reference("one_more", None) {
            Err(Error::Syntax { message, lexeme, .. }) => {
                assert_eq!(message, "too many distinct identifiers");
                assert_eq!(lexeme, "one_more");
            }
            other => panic!("expected an error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_symbols_have_no_action() {
        assert_eq!(Action::for_symbol(";"), None);
        assert_eq!(Action::for_symbol(EMPTY), None);
        assert_eq!(Action::for_symbol("more_operands"), Some(Action::Operands));
        assert_eq!(Action::for_symbol(ROOT), Some(Action::Root));
    }
}
