use std::rc::Rc;

use mlua::Lua;

use luawidget_bridge::Value;

use super::{boolean, string_list, Module};
use crate::host::GuestState;
use crate::render;

pub(super) fn install(lua: &Lua, state: &Rc<GuestState>) -> mlua::Result<()> {
    let module = Module::new(lua, "ui")?;

    let s = state.clone();
    module.function("show_text", move |_, args| {
        let text = if args.is_nil(0) {
            String::new()
        } else {
            match args.string(0) {
                Some(text) => text,
                None => return args.reject("text must be a string"),
            }
        };
        s.surface.borrow_mut().show(text);
        boolean(true)
    })?;

    let s = state.clone();
    module.function("show_lines", move |_, args| {
        let Some(lines) = string_list(&args.data(0)) else {
            return args.reject("lines must be a list");
        };
        let titles = string_list(&args.data(1));
        s.surface
            .borrow_mut()
            .show(render::lines(&lines, titles.as_deref()));
        boolean(true)
    })?;

    let s = state.clone();
    module.function("show_table", move |_, args| {
        let data = args.data(0);
        let Some(rows) = data.as_table() else {
            return args.reject("rows must be a list of lists");
        };
        let rows: Vec<Vec<String>> = rows
            .ipairs()
            .map(|row| string_list(row).unwrap_or_else(|| vec![render::cell(row)]))
            .collect();
        let main_column = args
            .integer(1)
            .filter(|c| *c >= 1)
            .map(|c| c as usize)
            .unwrap_or(1);
        let centering = args.truthy(2);
        s.surface
            .borrow_mut()
            .show(render::table(&rows, main_column, centering));
        boolean(true)
    })?;

    let s = state.clone();
    module.function("show_chart", move |_, args| {
        let data = args.data(0);
        let Some(points) = data.as_table() else {
            return args.reject("points must be a list");
        };
        let values: Vec<f64> = points.ipairs().filter_map(chart_point).collect();
        let format = args.string(1);
        let title = args.string(2);
        s.surface.borrow_mut().show(render::chart(
            &values,
            format.as_deref(),
            title.as_deref(),
        ));
        boolean(true)
    })?;

    let s = state.clone();
    module.function("show_progress_bar", move |_, args| {
        let text = args.string(0).unwrap_or_default();
        let (Some(current), Some(max)) = (args.number(1), args.number(2)) else {
            return args.reject("current and max must be numbers");
        };
        if !args.is_nil(3) {
            tracing::trace!(color = ?args.string(3), "progress bar color ignored");
        }
        s.surface
            .borrow_mut()
            .show(render::progress_bar(&text, current, max));
        boolean(true)
    })?;

    let s = state.clone();
    module.function("show_buttons", move |_, args| {
        let Some(labels) = string_list(&args.data(0)) else {
            return args.reject("labels must be a list");
        };
        let mut surface = s.surface.borrow_mut();
        surface.output = render::buttons(&labels);
        surface.buttons = labels;
        boolean(true)
    })?;

    let s = state.clone();
    module.function("show_toast", move |_, args| {
        let Some(message) = args.string(0) else {
            return args.reject("message must be a string");
        };
        tracing::info!(chunk = %s.chunk, %message, "toast");
        s.surface.borrow_mut().toasts.push(message);
        boolean(true)
    })?;

    let s = state.clone();
    module.function("show_context_menu", move |_, args| {
        let data = args.data(0);
        let Some(items) = data.as_table() else {
            return args.reject("items must be a list");
        };
        let labels: Vec<String> = items.ipairs().filter_map(menu_label).collect();
        s.surface.borrow_mut().menu = Some(labels);
        boolean(true)
    })?;

    let s = state.clone();
    module.function("set_title", move |_, args| {
        let Some(title) = args.string(0) else {
            return args.reject("title must be a string");
        };
        s.surface.borrow_mut().title = Some(title);
        boolean(true)
    })?;

    module.install()
}

/// The y value of a chart point: a number, or the second element of an
/// `{x, y}` pair.
fn chart_point(point: &Value) -> Option<f64> {
    match point {
        Value::Number(n) => Some(*n),
        Value::Table(pair) => pair.index(2).or_else(|| pair.index(1))?.as_number(),
        _ => None,
    }
}

/// A menu entry is a label or an `{icon, label}` list whose last string
/// is the label.
fn menu_label(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Number(_) => Some(render::cell(item)),
        Value::Table(parts) => parts
            .ipairs()
            .filter_map(|p| p.as_str().map(str::to_string))
            .last(),
        _ => None,
    }
}
