//! Interactive shell commands and the JSON form helpers they share with the CLI.

use anyhow::{anyhow, bail, Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::domain::{RecordId, ResourceKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Use(ResourceKind),
    Page(u32),
    Next,
    Prev,
    Show,
    Add(String),
    Edit(RecordId),
    Save(Option<String>),
    Cancel,
    Delete(RecordId),
    Stats,
    Login { username: String, password: String },
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  use <resource>          switch to users|products|carts|posts|comments|todos
  page <n> | next | prev  load another page
  show                    print the current view
  add <json>              create a record from a JSON draft
  edit <id>               select a record and load it into the form
  save [json]             submit the form, optionally patching it first
  cancel                  clear the form
  delete <id>             delete a record
  stats                   user gender breakdown
  login <user> <pass>     sign in
  quit";

pub fn parse_kind(raw: &str) -> Result<ResourceKind, String> {
    ResourceKind::from_collection(raw.trim()).ok_or_else(|| {
        let known: Vec<&str> = ResourceKind::ALL.iter().map(|kind| kind.collection()).collect();
        format!("unknown resource '{raw}', expected one of {}", known.join(", "))
    })
}

fn parse_id(raw: Option<&str>) -> Result<RecordId> {
    let raw = raw.ok_or_else(|| anyhow!("missing record id"))?;
    let id = raw
        .parse::<i64>()
        .with_context(|| format!("'{raw}' is not a record id"))?;
    Ok(RecordId(id))
}

fn rest(line: &str, word: &str) -> Option<String> {
    let text = line.trim_start().strip_prefix(word)?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

impl ShellCommand {
    /// Parses one shell line. JSON arguments keep their inner whitespace.
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            bail!("empty command, type 'help'");
        };
        let command = match verb.to_ascii_lowercase().as_str() {
            "use" => {
                let raw = words.next().ok_or_else(|| anyhow!("missing resource name"))?;
                ShellCommand::Use(parse_kind(raw).map_err(|err| anyhow!(err))?)
            }
            "page" => {
                let raw = words.next().ok_or_else(|| anyhow!("missing page number"))?;
                let page = raw
                    .parse::<u32>()
                    .with_context(|| format!("'{raw}' is not a page number"))?;
                ShellCommand::Page(page)
            }
            "next" => ShellCommand::Next,
            "prev" => ShellCommand::Prev,
            "show" | "ls" => ShellCommand::Show,
            "add" => ShellCommand::Add(rest(line, verb).ok_or_else(|| anyhow!("missing JSON draft"))?),
            "edit" => ShellCommand::Edit(parse_id(words.next())?),
            "save" => ShellCommand::Save(rest(line, verb)),
            "cancel" => ShellCommand::Cancel,
            "delete" | "rm" => ShellCommand::Delete(parse_id(words.next())?),
            "stats" => ShellCommand::Stats,
            "login" => {
                let username = words.next().ok_or_else(|| anyhow!("missing username"))?;
                let password = words.next().ok_or_else(|| anyhow!("missing password"))?;
                ShellCommand::Login {
                    username: username.to_string(),
                    password: password.to_string(),
                }
            }
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" => ShellCommand::Quit,
            other => bail!("unknown command '{other}', type 'help'"),
        };
        Ok(command)
    }
}

/// Overlays the fields of a JSON object onto `draft`.
pub fn merge_draft<D: Serialize + DeserializeOwned>(draft: &D, patch: &str) -> Result<D> {
    let patch: Value = serde_json::from_str(patch).context("form input is not valid JSON")?;
    let Value::Object(patch) = patch else {
        bail!("form input must be a JSON object");
    };
    let mut fields = match serde_json::to_value(draft)? {
        Value::Object(fields) => fields,
        _ => serde_json::Map::new(),
    };
    fields.extend(patch);
    serde_json::from_value(Value::Object(fields)).context("form input does not match the record fields")
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
