use std::fs;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use mlua::Lua;

use luawidget_bridge::{to_guest, Table, Value};

use super::{boolean, Args, Module};
use crate::host::GuestState;

pub(super) fn install(lua: &Lua, state: &Rc<GuestState>) -> mlua::Result<()> {
    let module = Module::new(lua, "files")?;

    let s = state.clone();
    module.function("read", move |lua, args| {
        let Some(path) = sandboxed(&s, &args) else {
            return Ok(mlua::Value::Nil);
        };
        match fs::read_to_string(&path) {
            Ok(text) => Ok(mlua::Value::String(lua.create_string(&text)?)),
            Err(error) => {
                if error.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), %error, "files.read failed");
                }
                Ok(mlua::Value::Nil)
            }
        }
    })?;

    let s = state.clone();
    module.function("write", move |_, args| {
        let Some(path) = sandboxed(&s, &args) else {
            return boolean(false);
        };
        let Some(text) = args.string(1) else {
            return args.reject("text must be a string");
        };
        let written = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::write(&path, text));
        match written {
            Ok(()) => boolean(true),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "files.write failed");
                boolean(false)
            }
        }
    })?;

    let s = state.clone();
    module.function("delete", move |_, args| {
        let Some(path) = sandboxed(&s, &args) else {
            return boolean(false);
        };
        boolean(fs::remove_file(&path).is_ok())
    })?;

    let s = state.clone();
    module.function("list", move |lua, args| {
        let Some(root) = s.services.files_root.as_ref() else {
            return args.reject_nil("no files directory configured");
        };
        let mut names: Vec<String> = match fs::read_dir(root) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                .filter_map(|e| e.file_name().into_string().ok())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        Ok(to_guest(
            lua,
            &Value::Table(Table::from_sequence(names)),
            &s.callbacks,
        )?)
    })?;

    module.install()
}

/// The path of the file named by the first argument, if the name is a
/// plain file name and a files directory is configured.
fn sandboxed(state: &GuestState, args: &Args) -> Option<PathBuf> {
    let Some(root) = state.services.files_root.as_ref() else {
        args.misuse("no files directory configured");
        return None;
    };
    let Some(name) = args.string(0) else {
        args.misuse("name must be a string");
        return None;
    };
    if !is_plain_name(&name) {
        args.misuse(&format!("{name:?} is not a plain file name"));
        return None;
    }
    Some(root.join(name))
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostServices;
    use tempfile::TempDir;

    fn lua_in(dir: &TempDir) -> Lua {
        let lua = Lua::new();
        let services = HostServices::in_memory().with_files_root(dir.path().join("files"));
        let state = Rc::new(GuestState::new("files-test", services));
        install(&lua, &state).unwrap();
        lua
    }

    #[test]
    fn write_read_list_delete() {
        let dir = TempDir::new().unwrap();
        let lua = lua_in(&dir);
        let (wrote, text, listed, deleted, gone): (bool, String, String, bool, bool) = lua
            .load(
                r#"
                local wrote = files:write("notes.txt", "hello")
                files.write("a.txt", 1)
                local text = files.read("notes.txt")
                local listed = table.concat(files.list(), ",")
                local deleted = files.delete("notes.txt")
                return wrote, text, listed, deleted, files.read("notes.txt") == nil
                "#,
            )
            .eval()
            .unwrap();
        assert!(wrote);
        assert_eq!(text, "hello");
        assert_eq!(listed, "a.txt,notes.txt");
        assert!(deleted);
        assert!(gone);
    }

    #[test]
    fn escaping_names_are_rejected() {
        let dir = TempDir::new().unwrap();
        let lua = lua_in(&dir);
        let results: (bool, bool, bool) = lua
            .load(
                r#"
                return files.write("../escape.txt", "x"),
                       files.write("sub/file.txt", "x"),
                       files.read("..") == nil
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!(results, (false, false, true));
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn empty_list_before_first_write() {
        let dir = TempDir::new().unwrap();
        let lua = lua_in(&dir);
        let n: i64 = lua.load("return #files.list()").eval().unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn plain_names() {
        assert!(is_plain_name("cache.json"));
        assert!(!is_plain_name(""));
        assert!(!is_plain_name("a/b"));
        assert!(!is_plain_name("a\\b"));
        assert!(!is_plain_name("."));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name("../x"));
        assert!(is_plain_name("x..y"));
        assert!(is_plain_name("..hidden"));
    }

    #[test]
    fn dotted_names_stay_inside_the_directory() {
        let dir = TempDir::new().unwrap();
        let lua = lua_in(&dir);
        let (wrote, text, parent): (bool, String, bool) = lua
            .load(
                r#"
                local wrote = files.write("backup..old", "v1")
                return wrote, files.read("backup..old"), files.write("..", "x")
                "#,
            )
            .eval()
            .unwrap();
        assert!(wrote);
        assert_eq!(text, "v1");
        assert!(!parent);
        assert!(dir.path().join("files").join("backup..old").exists());
    }
}
