//! Where the lexicon and grammar come from.
//!
//! The qes language ships with the front end, so by default nothing needs
//! to exist on disk. A different lexicon or grammar can be supplied as a
//! file, either directly or through the environment.
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{Error, Result};

pub const LEXER_FILE_VAR: &str = "QES_LEXER_FILE";
pub const GRAMMAR_FILE_VAR: &str = "QES_LL_GRAMMAR_FILE";

pub const BUILTIN_LEXICON: &str = include_str!("../../data/qes.lexicon");
pub const BUILTIN_GRAMMAR: &str = include_str!("../../data/qes.grammar");

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Resource {
    Builtin,
    File(PathBuf),
}

impl Resource {
    fn load(&self, builtin: &str) -> Result<String> {
        match self {
            Resource::Builtin => Ok(builtin.to_owned()),
            Resource::File(path) => read_resource(path),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Config {
    pub lexicon: Resource,
    pub grammar: Resource,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            lexicon: Resource::Builtin,
            grammar: Resource::Builtin,
        }
    }
}

impl Config {
    /// Both resources must be named by the environment.
    pub fn from_env() -> Result<Config> {
        Ok(Config {
            lexicon: Resource::File(path_from_env(LEXER_FILE_VAR)?),
            grammar: Resource::File(path_from_env(GRAMMAR_FILE_VAR)?),
        })
    }

    /// Explicit paths win, then the environment, then the built-in data.
    pub fn resolve(lexicon: Option<&Path>, grammar: Option<&Path>) -> Config {
        Config {
            lexicon: pick(lexicon, LEXER_FILE_VAR),
            grammar: pick(grammar, GRAMMAR_FILE_VAR),
        }
    }

    pub fn with_lexicon_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.lexicon = Resource::File(path.into());
        self
    }

    pub fn with_grammar_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.grammar = Resource::File(path.into());
        self
    }

    pub fn lexicon_text(&self) -> Result<String> {
        self.lexicon.load(BUILTIN_LEXICON)
    }

    pub fn grammar_text(&self) -> Result<String> {
        self.grammar.load(BUILTIN_GRAMMAR)
    }
}

fn pick(explicit: Option<&Path>, var: &str) -> Resource {
    if let Some(path) = explicit {
        return Resource::File(path.to_owned());
    }
    match env::var_os(var) {
        Some(path) if !path.is_empty() => Resource::File(PathBuf::from(path)),
        _ => Resource::Builtin,
    }
}

fn path_from_env(var: &str) -> Result<PathBuf> {
    match env::var_os(var) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Err(Error::missing(var, "environment variable is unset")),
    }
}

/// Reads a configuration file, reporting a missing file as
/// `ConfigurationMissing` rather than an I/O failure.
pub fn read_resource(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::missing(
            path.display().to_string(),
            "file does not exist",
        ));
    }
    fs::read_to_string(path).map_err(|e| Error::missing(path.display().to_string(), e.to_string()))
}
