//! Lua 5.4 backend for script processes
//!
//! The interpreter is sandboxed: only the base, `table`, `string`, `math`,
//! `utf8` and `coroutine` libraries are opened, the heap is capped, and
//! `print` is routed to `tracing` so stdout stays a clean response stream.

use super::{ScriptOptions, ScriptSource, NO_RESPONSE};
use crate::error::{ApplicationError, EvalError, HandlerError, ProcessError};
use crate::registry::{HandlerKind, MessageHandler, Reply};
use crate::store::StateStore;
use ao_types::Message;
use mlua::{Function, Lua, LuaOptions, StdLib, Table, Value, Variadic};
use std::fmt;
use tracing::{debug, info, warn};

/// Global a script may define to expose its state to `inspect_state`
const STATE_GLOBAL: &str = "State";

/// Log target for script `print` output
const PRINT_TARGET: &str = "ao_actors::script";

/// A loaded script and the name of its entry point
pub struct ScriptHandler {
    lua: Lua,
    name: String,
    entry_point: String,
}

impl ScriptHandler {
    /// Create a sandbox and run the script
    ///
    /// A script that never defines its entry point still loads; every
    /// dispatch then answers with a missing-handler error. On a load failure
    /// the interpreter is dropped before returning.
    pub fn load(source: &ScriptSource, options: &ScriptOptions) -> Result<Self, ProcessError> {
        let name = source.name();
        let code = source.read()?;
        let lua = new_sandbox(options)?;

        lua.load(code.as_str())
            .set_name(name.clone())
            .exec()
            .map_err(|e| ProcessError::script_load(name.as_str(), e.to_string()))?;

        let handler = Self {
            lua,
            name,
            entry_point: options.entry_point.clone(),
        };

        if handler.entry_function().is_none() {
            warn!(
                script = %handler.name,
                entry_point = %handler.entry_point,
                "Script does not define its entry point"
            );
        }

        info!(
            script = %handler.name,
            entry_point = %handler.entry_point,
            "Script loaded"
        );
        Ok(handler)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Bytes currently allocated by the interpreter
    pub fn used_memory(&self) -> usize {
        self.lua.used_memory()
    }

    fn entry_function(&self) -> Option<Function> {
        match self.lua.globals().get::<Value>(self.entry_point.as_str()) {
            Ok(Value::Function(function)) => Some(function),
            _ => None,
        }
    }
}

impl MessageHandler for ScriptHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Script
    }

    fn handle(&mut self, message: &Message, _store: &mut StateStore) -> Result<Reply, HandlerError> {
        let entry = self.entry_function().ok_or_else(|| HandlerError::Missing {
            entry_point: self.entry_point.clone(),
        })?;

        let table = message_table(&self.lua, message).map_err(|e| HandlerError::fault(e.to_string()))?;
        let value: Value = entry
            .call(table)
            .map_err(|e| HandlerError::fault(e.to_string()))?;

        reply_from_value(value)
    }

    fn eval(&mut self, code: &str) -> Result<String, EvalError> {
        let value: Value = self
            .lua
            .load(code)
            .set_name("=eval")
            .eval()
            .map_err(eval_error)?;

        match value {
            Value::Nil => Ok("null".to_string()),
            Value::String(text) => Ok(text.to_string_lossy().to_string()),
            other => serde_json::to_string(&other).map_err(|e| EvalError::Encode(e.to_string())),
        }
    }

    fn inspect(&self, _store: &StateStore) -> Result<serde_json::Value, ProcessError> {
        let state = self
            .lua
            .globals()
            .get::<Value>(STATE_GLOBAL)
            .map_err(|e| ProcessError::Interpreter(e.to_string()))?;

        match state {
            Value::Nil => Ok(serde_json::Value::Object(Default::default())),
            other => serde_json::to_value(&other).map_err(|e| ProcessError::Encode(e.to_string())),
        }
    }

    fn shutdown(&mut self) {
        debug!(
            script = %self.name,
            used_memory = self.lua.used_memory(),
            "Releasing interpreter"
        );
    }
}

impl fmt::Debug for ScriptHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptHandler")
            .field("name", &self.name)
            .field("entry_point", &self.entry_point)
            .finish_non_exhaustive()
    }
}

fn new_sandbox(options: &ScriptOptions) -> Result<Lua, ProcessError> {
    let libs = StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8 | StdLib::COROUTINE;
    let lua = Lua::new_with(libs, LuaOptions::new())
        .map_err(|e| ProcessError::Interpreter(e.to_string()))?;

    if let Some(limit) = options.memory_limit_bytes {
        lua.set_memory_limit(limit)
            .map_err(|e| ProcessError::Interpreter(e.to_string()))?;
    }

    redirect_print(&lua).map_err(|e| ProcessError::Interpreter(e.to_string()))?;
    Ok(lua)
}

fn redirect_print(lua: &Lua) -> mlua::Result<()> {
    let print = lua.create_function(|_, args: Variadic<Value>| {
        let line = args.iter().map(display_value).collect::<Vec<_>>().join("\t");
        info!(target: PRINT_TARGET, "{}", line);
        Ok(())
    })?;
    lua.globals().set("print", print)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.to_string_lossy().to_string(),
        other => other.type_name().to_string(),
    }
}

/// Build the per-dispatch message table
fn message_table(lua: &Lua, message: &Message) -> mlua::Result<Table> {
    let table = lua.create_table()?;

    let fields: [(&str, &Option<String>); 11] = [
        ("Id", &message.id),
        ("From", &message.from),
        ("Owner", &message.owner),
        ("Target", &message.target),
        ("Anchor", &message.anchor),
        ("Data", &message.data),
        ("Timestamp", &message.timestamp),
        ("Block-Height", &message.block_height),
        ("Hash-Chain", &message.hash_chain),
        ("Key", &message.key),
        ("Value", &message.value),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            table.set(name, value.as_str())?;
        }
    }
    table.set("Action", message.action.as_str())?;

    let tags = lua.create_table()?;
    for (name, value) in &message.tags {
        tags.set(name.as_str(), value.as_str())?;
    }
    table.set("Tags", tags)?;

    Ok(table)
}

fn reply_from_value(value: Value) -> Result<Reply, HandlerError> {
    match value {
        Value::Nil => Err(ApplicationError::rejected(NO_RESPONSE).into()),
        Value::String(text) => Ok(Reply::Raw(text.to_string_lossy().to_string())),
        value @ (Value::Table(_) | Value::Boolean(_) | Value::Integer(_) | Value::Number(_)) => {
            serde_json::to_string(&value)
                .map(Reply::Raw)
                .map_err(|e| HandlerError::fault(format!("Failed to encode handler result: {}", e)))
        }
        other => Err(HandlerError::fault(format!(
            "Unsupported return type: {}",
            other.type_name()
        ))),
    }
}

fn eval_error(error: mlua::Error) -> EvalError {
    match error {
        mlua::Error::SyntaxError { message, .. } => EvalError::Syntax(message),
        other => EvalError::Runtime(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ECHO_SCRIPT: &str = r#"
State = { count = 0 }

function handle(msg)
    State.count = State.count + 1
    return {
        Target = msg.From or "unknown",
        Action = msg.Action .. "-Response",
        Data = msg.Tags["Note"] or "none",
    }
end
"#;

    fn load(code: &str) -> Result<ScriptHandler, ProcessError> {
        ScriptHandler::load(&ScriptSource::inline("test.lua", code), &ScriptOptions::default())
    }

    fn raw(reply: Reply) -> String {
        match reply {
            Reply::Raw(text) => text,
            Reply::Envelope(response) => panic!("unexpected envelope {:?}", response),
        }
    }

    #[test]
    fn test_table_reply_is_encoded_as_json() {
        let mut handler = load(ECHO_SCRIPT).unwrap();
        let mut store = StateStore::unbounded();
        let message = Message::builder("Ping").from("alice").tag("Note", "hi").build();

        let wire = raw(handler.handle(&message, &mut store).unwrap());
        let value: serde_json::Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(value["Target"], "alice");
        assert_eq!(value["Action"], "Ping-Response");
        assert_eq!(value["Data"], "hi");
    }

    #[test]
    fn test_string_reply_is_verbatim() {
        let mut handler = load("function handle(msg) return 'plain text' end").unwrap();
        let mut store = StateStore::unbounded();
        let wire = raw(handler.handle(&Message::builder("Any").build(), &mut store).unwrap());
        assert_eq!(wire, "plain text");
    }

    #[test]
    fn test_nil_reply_is_rejected() {
        let mut handler = load("function handle(msg) end").unwrap();
        let mut store = StateStore::unbounded();
        let err = handler
            .handle(&Message::builder("Any").build(), &mut store)
            .unwrap_err();
        assert_eq!(err.to_string(), NO_RESPONSE);
    }

    #[test]
    fn test_runtime_error_is_a_fault() {
        let mut handler = load("function handle(msg) error('boom') end").unwrap();
        let mut store = StateStore::unbounded();
        let err = handler
            .handle(&Message::builder("Any").build(), &mut store)
            .unwrap_err();
        assert!(matches!(err, HandlerError::Fault(ref text) if text.contains("boom")));
    }

    #[test]
    fn test_script_without_entry_point_loads_but_reports_missing() {
        let mut handler = load("x = 1").unwrap();
        let mut store = StateStore::unbounded();
        let err = handler
            .handle(&Message::builder("Ping").build(), &mut store)
            .unwrap_err();
        assert_eq!(
            err,
            HandlerError::Missing {
                entry_point: "handle".to_string()
            }
        );
        assert_eq!(handler.eval("x").unwrap(), "1");
    }

    #[test]
    fn test_syntax_error_fails_to_load() {
        let err = load("function handle(").unwrap_err();
        assert!(matches!(err, ProcessError::ScriptLoad { .. }));
    }

    #[test]
    fn test_sandbox_hides_io_and_os() {
        let mut handler = load("function handle(msg) return tostring(io) .. ',' .. tostring(os) end").unwrap();
        let mut store = StateStore::unbounded();
        let wire = raw(handler.handle(&Message::builder("Any").build(), &mut store).unwrap());
        assert_eq!(wire, "nil,nil");
    }

    #[test]
    fn test_eval_and_inspect() {
        let mut handler = load(ECHO_SCRIPT).unwrap();
        let mut store = StateStore::unbounded();
        handler.handle(&Message::builder("Ping").build(), &mut store).unwrap();

        assert_eq!(handler.eval("State.count").unwrap(), "1");
        assert_eq!(handler.eval("'text'").unwrap(), "text");
        assert_eq!(handler.eval("x = 5").unwrap(), "null");
        assert_eq!(handler.inspect(&store).unwrap(), json!({ "count": 1 }));
    }

    #[test]
    fn test_eval_errors_are_classified() {
        let mut handler = load(ECHO_SCRIPT).unwrap();
        assert!(matches!(handler.eval("local = ="), Err(EvalError::Syntax(_))));
        assert!(matches!(handler.eval("error('bad')"), Err(EvalError::Runtime(_))));
    }

    #[test]
    fn test_inspect_without_state_is_empty_object() {
        let handler = load("function handle(msg) return 'x' end").unwrap();
        let store = StateStore::unbounded();
        assert_eq!(handler.inspect(&store).unwrap(), json!({}));
    }

    #[test]
    fn test_removed_entry_point_is_reported_missing() {
        let mut handler = load(ECHO_SCRIPT).unwrap();
        handler.eval("handle = nil").unwrap();
        let mut store = StateStore::unbounded();
        let err = handler
            .handle(&Message::builder("Ping").build(), &mut store)
            .unwrap_err();
        assert_eq!(
            err,
            HandlerError::Missing {
                entry_point: "handle".to_string()
            }
        );
    }
}
