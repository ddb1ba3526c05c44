use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::shell::{Evaluation, Interpreter, ShellError};

/// Variable environment shared by every session.
#[derive(Debug, Default)]
pub struct Binding {
    variables: RwLock<BTreeMap<String, String>>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.variables.read().get(name).cloned()
    }

    /// Binds `name` to `value`, returning the previous value.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.variables.write().insert(name.into(), value.into())
    }

    pub fn remove(&self, name: &str) -> Option<String> {
        self.variables.write().remove(name)
    }

    /// Snapshot of all bindings, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.variables
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Line interpreter over a [`Binding`].
///
/// Grammar, one statement per line:
///
/// ```text
/// name = value     bind a variable (no output)
/// name             print the bound value
/// :vars            print every binding as name=value
/// :unset name      remove a binding
/// :quit | exit     end the session
/// ```
///
/// Startup scripts are files of such statements. Blank lines and lines
/// starting with `#` are skipped.
#[derive(Debug, Default)]
pub struct BindingShell {
    binding: Binding,
    script_dir: Option<PathBuf>,
}

impl BindingShell {
    pub fn new(binding: Binding) -> Self {
        Self {
            binding,
            script_dir: None,
        }
    }

    /// Resolves relative script identifiers against `dir`.
    pub fn with_script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.script_dir = Some(dir.into());
        self
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    fn script_path(&self, script: &str) -> PathBuf {
        let path = Path::new(script);
        match &self.script_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn list_vars(&self) -> Evaluation {
        let vars = self.binding.snapshot();
        if vars.is_empty() {
            return Evaluation::Output("(none)".to_string());
        }
        let listing = vars
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(" ");
        Evaluation::Output(listing)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Interpreter for BindingShell {
    fn eval(&self, line: &str) -> Result<Evaluation, ShellError> {
        let line = line.trim();

        match line {
            "" => return Ok(Evaluation::Silent),
            ":quit" | "exit" => return Ok(Evaluation::Exit),
            ":vars" => return Ok(self.list_vars()),
            _ => {}
        }

        if let Some(name) = line.strip_prefix(":unset ") {
            let name = name.trim();
            return match self.binding.remove(name) {
                Some(_) => Ok(Evaluation::Silent),
                None => Err(ShellError::UnknownVariable(name.to_string())),
            };
        }

        if line.starts_with(':') {
            return Err(ShellError::UnknownCommand(line.to_string()));
        }

        if let Some((name, value)) = line.split_once('=') {
            let name = name.trim();
            if !is_identifier(name) {
                return Err(ShellError::InvalidName(name.to_string()));
            }
            self.binding.set(name, value.trim());
            return Ok(Evaluation::Silent);
        }

        if is_identifier(line) {
            return self
                .binding
                .get(line)
                .map(Evaluation::Output)
                .ok_or_else(|| ShellError::UnknownVariable(line.to_string()));
        }

        Err(ShellError::UnknownCommand(line.to_string()))
    }

    fn run_script(&self, script: &str) -> Result<(), ShellError> {
        let source =
            std::fs::read_to_string(self.script_path(script)).map_err(|source| {
                ShellError::ScriptIo {
                    script: script.to_string(),
                    source,
                }
            })?;

        for (index, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match self.eval(line) {
                Ok(Evaluation::Exit) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(ShellError::ScriptLine {
                        script: script.to_string(),
                        line: index + 1,
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(())
    }
}
