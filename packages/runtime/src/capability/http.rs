use std::collections::BTreeMap;
use std::rc::Rc;

use mlua::Lua;

use luawidget_bridge::{format_number, to_host_data, to_json, Value};
use luawidget_net::Method;

use super::{boolean, Args, Module};
use crate::host::{Continuation, GuestState};

const CONTENT_TYPE: &str = "Content-Type";

pub(super) fn install(lua: &Lua, state: &Rc<GuestState>) -> mlua::Result<()> {
    let module = Module::new(lua, "http")?;

    for (name, method) in [
        ("get", Method::GET),
        ("post", Method::POST),
        ("put", Method::PUT),
        ("delete", Method::DELETE),
    ] {
        let s = state.clone();
        module.function(name, move |lua, args| request(lua, &s, method, args))?;
    }

    let s = state.clone();
    module.function("set_headers", move |_, args| {
        if args.is_nil(0) {
            s.services.network.borrow_mut().clear_global_headers();
            return boolean(true);
        }
        let Some(headers) = header_map(&args.data(0)) else {
            return args.reject("headers must be a table of name = value");
        };
        s.services.network.borrow_mut().set_global_headers(headers);
        boolean(true)
    })?;

    let s = state.clone();
    module.function("clear_headers", move |_, _| {
        s.services.network.borrow_mut().clear_global_headers();
        boolean(true)
    })?;

    module.install()
}

/// What the trailing arguments of a request call asked for.
#[derive(Debug, Default)]
struct RequestOptions {
    body: Option<String>,
    headers: BTreeMap<String, String>,
    callback: Option<mlua::Function>,
    id: Option<String>,
}

fn request(lua: &Lua, state: &GuestState, method: Method, args: Args) -> mlua::Result<mlua::Value> {
    let Some(url) = args.string(0) else {
        return args.reject("url must be a string");
    };
    let options = match parse_options(method, &args) {
        Ok(options) => options,
        Err(problem) => return args.reject(&problem),
    };

    let continuation = match options.callback {
        Some(function) => Continuation::Callback(state.callbacks.retain(lua, function)?),
        None => Continuation::Entry { id: options.id },
    };

    let id = state.services.network.borrow_mut().issue(
        method,
        &url,
        options.headers,
        options.body,
    );
    state.pending.borrow_mut().insert(id, continuation);
    boolean(true)
}

/// Classify trailing arguments by kind.
///
/// For POST and PUT the first trailing argument is the body, unless it is
/// the completion callback; then the first later string or number is the
/// body. Otherwise a function is the callback, a table the request headers
/// and a string the request id, except that a string shaped like a media
/// type (`type/subtype`) on a body request sets the content type instead.
fn parse_options(method: Method, args: &Args) -> Result<RequestOptions, String> {
    let mut options = RequestOptions::default();
    let mut content_type: Option<String> = None;
    let mut trailing = args.rest(1);
    let mut body_after_callback = false;

    if method.has_body() {
        match trailing.split_first() {
            Some((mlua::Value::Function(_), _)) => body_after_callback = true,
            Some((body, rest)) => {
                if let Some((text, kind)) = encode_body(body)? {
                    options.body = Some(text);
                    content_type = kind;
                }
                trailing = rest;
            }
            None => {}
        }
    }

    let mut explicit_type = false;
    for value in trailing {
        if body_after_callback
            && options.callback.is_some()
            && matches!(
                value,
                mlua::Value::Nil
                    | mlua::Value::String(_)
                    | mlua::Value::Integer(_)
                    | mlua::Value::Number(_)
            )
        {
            options.body = encode_body(value)?.map(|(text, _)| text);
            body_after_callback = false;
            continue;
        }
        match value {
            mlua::Value::Nil => {}
            mlua::Value::Function(f) => {
                if options.callback.is_none() {
                    options.callback = Some(f.clone());
                } else {
                    tracing::debug!("extra callback argument ignored");
                }
            }
            mlua::Value::Table(_) => {
                let data = to_host_data(value).map_err(|e| format!("headers unreadable: {e}"))?;
                let headers = header_map(&data).ok_or("headers must map names to values")?;
                options.headers.extend(headers);
            }
            mlua::Value::String(s) => {
                let text = s.to_string_lossy().to_string();
                if method.has_body() && !explicit_type && is_media_type(&text) {
                    content_type = Some(text);
                    explicit_type = true;
                } else if options.id.is_none() {
                    options.id = Some(text);
                } else {
                    tracing::debug!(extra = %text, "extra string argument ignored");
                }
            }
            other => return Err(format!("unexpected {} argument", other.type_name())),
        }
    }

    if let Some(content_type) = content_type {
        let already_set = options
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case(CONTENT_TYPE));
        if !already_set {
            options.headers.insert(CONTENT_TYPE.to_string(), content_type);
        }
    }
    Ok(options)
}

/// A request body and the content type it implies. `nil` is no body.
fn encode_body(value: &mlua::Value) -> Result<Option<(String, Option<String>)>, String> {
    Ok(match value {
        mlua::Value::Nil => None,
        mlua::Value::String(s) => Some((s.to_string_lossy().to_string(), None)),
        mlua::Value::Integer(i) => Some((i.to_string(), None)),
        mlua::Value::Number(n) => Some((format_number(*n), None)),
        mlua::Value::Table(_) => {
            let data = to_host_data(value).map_err(|e| format!("body not encodable: {e}"))?;
            Some((to_json(&data).to_string(), Some("application/json".to_string())))
        }
        other => return Err(format!("body cannot be a {}", other.type_name())),
    })
}

fn is_media_type(text: &str) -> bool {
    match text.split(';').next().and_then(|t| t.trim().split_once('/')) {
        Some((kind, subtype)) => {
            let token = |s: &str| {
                !s.is_empty()
                    && s.chars()
                        .all(|c| c.is_ascii_alphanumeric() || "!#$&^_.+-".contains(c))
            };
            token(kind) && token(subtype)
        }
        None => false,
    }
}

/// Header names must be strings; values may be strings or numbers.
fn header_map(value: &Value) -> Option<BTreeMap<String, String>> {
    let table = value.as_table()?;
    if table.array().next().is_some() {
        return None;
    }
    table
        .fields()
        .map(|(name, v)| match v {
            Value::String(s) => Some((name.to_string(), s.clone())),
            Value::Number(_) | Value::Bool(_) => Some((name.to_string(), v.to_string())),
            _ => None,
        })
        .collect()
}
