use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::storage::btree::BTree;
use crate::types::IndexError;

use super::load_extract::{extract_file, load_file, print_pairs, CliError};

const MENU: &str = "\
Commands:
  create   Create a new index file
  open     Open an existing index file
  insert   Insert a key/value pair
  search   Search for a key
  load     Load key,value pairs from a file
  print    Print every pair in key order
  extract  Write every pair to a file
  quit     Exit
";

/// Options for [`Shell`].
#[derive(Debug, Clone)]
pub struct ShellOptions {
    /// Ask before replacing an existing file on `create` and `extract`.
    pub confirm_overwrite: bool,
    /// Print the command menu before each prompt.
    pub show_menu: bool,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            confirm_overwrite: true,
            show_menu: true,
        }
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Line-oriented interactive front end over one open index at a time.
///
/// Arguments may follow the command on the same line; anything missing is
/// prompted for. Errors are reported and the loop carries on.
pub struct Shell<R, W> {
    input: R,
    out: W,
    options: ShellOptions,
    pending: VecDeque<String>,
    current: Option<(PathBuf, BTree)>,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    /// Creates a shell reading commands from `input` and writing to `out`.
    pub fn new(input: R, out: W, options: ShellOptions) -> Self {
        Self {
            input,
            out,
            options,
            pending: VecDeque::new(),
            current: None,
        }
    }

    /// Opens `path` before the first command is read.
    pub fn open(&mut self, path: &Path) -> Result<(), CliError> {
        let tree = BTree::open(path)?;
        self.current = Some((path.to_path_buf(), tree));
        writeln!(self.out, "Opened {}.", path.display())?;
        Ok(())
    }

    /// Runs until `quit` or end of input.
    pub fn run(&mut self) -> Result<(), CliError> {
        loop {
            if self.options.show_menu {
                write!(self.out, "{MENU}")?;
            }
            let Some(line) = self.prompt_line("Enter a command: ")? else {
                break;
            };
            let mut words = line.split_whitespace().map(str::to_string);
            let Some(command) = words.next() else {
                continue;
            };
            self.pending = words.collect();
            match self.dispatch(&command.to_ascii_lowercase()) {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(err) => {
                    tracing::debug!(
                        target: "blockdex::shell",
                        command = %command,
                        error = %err,
                        "command failed"
                    );
                    writeln!(self.out, "Error: {err}")?;
                }
            }
            self.pending.clear();
        }
        writeln!(self.out, "Exiting.")?;
        Ok(())
    }

    fn dispatch(&mut self, command: &str) -> Result<Flow, CliError> {
        match command {
            "create" => self.create()?,
            "open" => self.open_prompted()?,
            "insert" => self.insert()?,
            "search" => self.search()?,
            "load" => self.load()?,
            "print" => self.print()?,
            "extract" => self.extract()?,
            "quit" | "exit" => return Ok(Flow::Quit),
            other => writeln!(self.out, "Invalid command '{other}'. Please try again.")?,
        }
        Ok(Flow::Continue)
    }

    fn create(&mut self) -> Result<(), CliError> {
        let path = PathBuf::from(self.argument("Enter the file name to create: ")?);
        if path.exists() && !self.confirm_overwrite()? {
            writeln!(self.out, "File creation aborted.")?;
            return Ok(());
        }
        let tree = BTree::create(&path)?;
        self.current = Some((path, tree));
        writeln!(self.out, "File created successfully.")?;
        Ok(())
    }

    fn open_prompted(&mut self) -> Result<(), CliError> {
        let path = PathBuf::from(self.argument("Enter the file name to open: ")?);
        self.current = None;
        match BTree::open(&path) {
            Ok(tree) => {
                self.current = Some((path, tree));
                writeln!(self.out, "File opened successfully.")?;
                Ok(())
            }
            Err(IndexError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => Err(
                CliError::Message(format!("{} does not exist", path.display())),
            ),
            Err(err) => Err(err.into()),
        }
    }

    fn insert(&mut self) -> Result<(), CliError> {
        self.require_open()?;
        let key = self.number("Enter key: ")?;
        let value = self.number("Enter value: ")?;
        self.tree_mut()?.insert(key, value)?;
        writeln!(self.out, "Inserted {key}.")?;
        Ok(())
    }

    fn search(&mut self) -> Result<(), CliError> {
        self.require_open()?;
        let key = self.number("Enter key: ")?;
        let found = self.tree_mut()?.search(key)?;
        match found {
            Some(value) => writeln!(self.out, "{key} {value}")?,
            None => writeln!(self.out, "Key not found.")?,
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), CliError> {
        self.require_open()?;
        let path = PathBuf::from(self.argument("Enter the file name to load from: ")?);
        let report = load_file(self.tree_mut()?, &path)?;
        for issue in &report.issues {
            writeln!(self.out, "{issue}")?;
        }
        writeln!(
            self.out,
            "Loaded {} pairs ({} duplicates, {} malformed lines skipped).",
            report.inserted, report.duplicates, report.malformed
        )?;
        Ok(())
    }

    fn print(&mut self) -> Result<(), CliError> {
        self.require_open()?;
        let Some((_, tree)) = self.current.as_ref() else {
            return Err(no_file());
        };
        print_pairs(tree, &mut self.out)?;
        Ok(())
    }

    fn extract(&mut self) -> Result<(), CliError> {
        self.require_open()?;
        let path = PathBuf::from(self.argument("Enter the file name to extract to: ")?);
        if path.exists() && !self.confirm_overwrite()? {
            writeln!(self.out, "Extract aborted.")?;
            return Ok(());
        }
        let written = extract_file(self.tree_mut()?, &path, true)?;
        writeln!(self.out, "Extract completed ({written} pairs).")?;
        Ok(())
    }

    fn require_open(&self) -> Result<(), CliError> {
        if self.current.is_none() {
            return Err(no_file());
        }
        Ok(())
    }

    fn tree_mut(&mut self) -> Result<&mut BTree, CliError> {
        self.current
            .as_mut()
            .map(|(_, tree)| tree)
            .ok_or_else(no_file)
    }

    fn confirm_overwrite(&mut self) -> Result<bool, CliError> {
        if !self.options.confirm_overwrite {
            return Ok(true);
        }
        let answer = self.argument("File already exists. Overwrite? (y/n): ")?;
        Ok(answer.eq_ignore_ascii_case("y"))
    }

    /// Next word left on the command line, else a prompted line.
    fn argument(&mut self, prompt: &str) -> Result<String, CliError> {
        if let Some(word) = self.pending.pop_front() {
            return Ok(word);
        }
        loop {
            let Some(line) = self.prompt_line(prompt)? else {
                return Err(CliError::Message("unexpected end of input".into()));
            };
            let mut words = line.split_whitespace().map(str::to_string);
            if let Some(first) = words.next() {
                self.pending.extend(words);
                return Ok(first);
            }
        }
    }

    fn number(&mut self, prompt: &str) -> Result<u64, CliError> {
        let word = self.argument(prompt)?;
        word.parse::<u64>()
            .map_err(|_| CliError::Message(format!("invalid input '{word}'")))
    }

    fn prompt_line(&mut self, prompt: &str) -> Result<Option<String>, CliError> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

fn no_file() -> CliError {
    CliError::Message("no index file is open".into())
}
