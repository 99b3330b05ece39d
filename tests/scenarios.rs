//! End-to-end harness scenarios: compile literal snippets against a
//! shared provider and assert on the diagnostics that come back.

use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use decl_harness::{
    compile, Category, DiagnosticOptions, DiagnosticsExt, FileProvider, Severity,
};

/// The shared provider every scenario compiles against, mirroring a
/// test-suite-wide fixture: one synthetic application module plus one
/// synthetic declaration library.
fn provider() -> FileProvider {
    FileProvider::builder()
        .file(
            "awesome-app.decl",
            r#"
export const api: { setAuthToken: (token: string) -> void };

export const btns: {
  logout: { onclick: () -> void },
  save: { onclick: () -> void },
};
"#,
        )
        .build()
        .expect("provider with no search dirs always builds")
}

#[test]
fn mistyped_property_on_event_payload_suggests_the_field() {
    let provider = provider();
    let result = compile(
        r#"
import { api } from "awesome-app";

interface UserEventsMap {
  "e:user.login": { token: string };
  "e:user.logout": { user: { firstName: string } };
}

const hub: Emitter<UserEventsMap>;

hub.on("e:user.login", data => {
  let token = data.tokne;
  api.setAuthToken(token);
});
"#,
        &provider,
    )
    .unwrap();

    assert_eq!(result.diagnostics.len(), 1, "{:#?}", result.diagnostics);
    let diag = &result.diagnostics[0];
    assert_eq!(diag.severity, Severity::Error);
    assert_eq!(diag.category, Category::Check);
    assert_eq!(
        diag.message,
        "property `tokne` does not exist on type `{ token: string }`"
    );
    assert_eq!(diag.hints, vec!["did you mean `token`?"]);
}

#[test]
fn undeclared_event_key_reports_against_the_key_union() {
    let provider = provider();
    let result = compile(
        r#"
interface UserEventsMap {
  "e:user.login": { token: string };
  "e:user.logout": { user: { firstName: string } };
}

const hub: Emitter<UserEventsMap>;

hub.on("e:user.signout", data => { });
"#,
        &provider,
    )
    .unwrap();

    assert_eq!(result.diagnostics.len(), 1, "{:#?}", result.diagnostics);
    assert_eq!(
        result.diagnostics[0].message,
        "argument of type `\"e:user.signout\"` is not assignable to parameter of type \
         `\"e:user.login\" | \"e:user.logout\"`"
    );
    assert_eq!(result.diagnostics[0].category, Category::Check);
}

#[test]
fn unregistered_import_is_one_resolution_diagnostic_and_nothing_else() {
    let provider = provider();
    let result = compile(
        r#"
import { missingThing } from "never-registered";

missingThing.whatever(1);
"#,
        &provider,
    )
    .unwrap();

    assert_eq!(result.diagnostics.len(), 1, "{:#?}", result.diagnostics);
    assert_eq!(result.diagnostics[0].category, Category::Resolution);
    assert_eq!(
        result.diagnostics[0].message,
        "cannot resolve module `\"never-registered\"`"
    );
    // The unresolved names are poisoned: no checking diagnostics for
    // anything done with them.
    assert_eq!(result.diagnostics.category_count(Category::Check), 0);
    assert!(result.loaded_modules.is_empty());
}

#[test]
fn intersected_event_maps_merge_payload_fields() {
    let provider = provider();
    let result = compile(
        r#"
interface UserEventsMap {
  "e:user.save": { user: { firstName: string, lastName: string } };
}

interface AdminEventsMap {
  "e:user.save": { user: { username: string }, roles: { count: number } };
}

const hub: Emitter<UserEventsMap & AdminEventsMap>;

hub.on("e:user.save", data => {
  let who = data.user.username;
  let first = data.user.firstName;
  let roles = data.roles.count;
});
"#,
        &provider,
    )
    .unwrap();

    assert!(
        result.is_clean(),
        "{}",
        result.format_diagnostics(&DiagnosticOptions::plain())
    );
}

#[test]
fn emit_payload_is_checked_against_the_event_map() {
    let provider = provider();
    let result = compile(
        r#"
import { btns } from "awesome-app";

interface UserEventsMap {
  "e:user.logout": { user: { firstName: string } };
}

const hub: Emitter<UserEventsMap>;

btns.logout.onclick = () => {
  hub.emit("e:user.logout", {});
};
"#,
        &provider,
    )
    .unwrap();

    assert_eq!(result.diagnostics.len(), 1, "{:#?}", result.diagnostics);
    assert_eq!(
        result.diagnostics[0].message,
        "argument of type `{}` is not assignable to parameter of type \
         `{ user: { firstName: string } }`"
    );
}

#[test]
fn diagnostics_preserve_source_order() {
    let provider = provider();
    let result = compile(
        r#"
interface Events {
  "e:a": { first: string };
  "e:b": { second: string };
}

const hub: Emitter<Events>;

hub.on("e:a", data => data.firts);
hub.on("e:b", data => data.secodn);
"#,
        &provider,
    )
    .unwrap();

    assert_eq!(result.diagnostics.len(), 2);
    assert!(result.diagnostics[0].message.contains("`firts`"));
    assert!(result.diagnostics[1].message.contains("`secodn`"));
}

#[test]
fn compilation_is_deterministic_across_runs() {
    let provider = provider();
    let source = r#"
import { api } from "awesome-app";

interface Events { "e:a": { token: string }; }
const hub: Emitter<Events>;

hub.on("e:a", data => api.setAuthToken(data.tokne));
hub.on("e:missing", data => { });
"#;

    let first = compile(source, &provider).unwrap();
    let second = compile(source, &provider).unwrap();

    assert_eq!(first.diagnostics, second.diagnostics);
    assert_eq!(
        first.format_diagnostics(&DiagnosticOptions::plain()),
        second.format_diagnostics(&DiagnosticOptions::plain())
    );
    assert_eq!(first.to_stable_string(), second.to_stable_string());
}

#[test]
fn short_format_renders_exact_positions() {
    let provider = provider();
    let source = "interface Events { \"e:a\": { n: number }; }\n\
                  const hub: Emitter<Events>;\n\
                  hub.on(\"e:b\", data => { });\n";

    let result = compile(source, &provider).unwrap();
    let out = result.format_diagnostics(&DiagnosticOptions::short());
    assert_eq!(
        out,
        "<snippet>:3:8: error: argument of type `\"e:b\"` is not assignable to \
         parameter of type `\"e:a\"`\n"
    );
}

#[test]
fn declaration_modules_load_from_disk_and_mix_with_synthetic_files() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("events.decl"),
        r#"
export interface SocketEvents {
  "e:heartbeat": { at: number };
}

export const socket: Emitter<SocketEvents>;
"#,
    )
    .unwrap();

    let provider = FileProvider::builder()
        .search_dir(dir.path())
        .file(
            "awesome-app.decl",
            "export const api: { setAuthToken: (token: string) -> void };",
        )
        .build()
        .unwrap();

    let result = compile(
        r#"
import { socket } from "events";
import { api } from "awesome-app";

socket.on("e:heartbeat", data => api.setAuthToken(data.at));
"#,
        &provider,
    )
    .unwrap();

    // `data.at` is a number, not the string the api wants.
    assert_eq!(result.diagnostics.len(), 1, "{:#?}", result.diagnostics);
    assert_eq!(
        result.diagnostics[0].message,
        "argument of type `number` is not assignable to parameter of type `string`"
    );
    assert_eq!(result.loaded_modules, vec!["events.decl", "awesome-app.decl"]);
}

#[test]
fn stable_string_round_trips_through_json() {
    let provider = provider();
    let result = compile(
        "interface E { \"e:a\": { n: number }; }\nconst hub: Emitter<E>;\nhub.off(\"e:a\", 1);\n",
        &provider,
    )
    .unwrap();

    let stable = result.to_stable_string();
    let parsed: serde_json::Value = serde_json::from_str(&stable).unwrap();
    let entries = parsed.as_array().unwrap();
    assert_eq!(entries.len(), result.diagnostics.len());
    assert_eq!(entries[0]["severity"], "error");
    assert_eq!(entries[0]["file"], "<snippet>");
    assert!(
        entries[0]["message"]
            .as_str()
            .unwrap()
            .contains("property `off` does not exist")
    );
}
