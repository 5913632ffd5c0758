//! Integration tests for YAML parsing

mod common;

use common::{create_test_config, create_test_config_in_subdir, demo_config, load};
use kiln::actions::{ActionKind, HandlerTable};
use kiln::config::{
    action_sections, find_config_file_from, parse_config, parse_config_file, validate_config,
    ConfigNode,
};
use kiln::error::ConfigError;
use kiln::runner::{load_bindings, Context, Runner, Verbosity};
use kiln::KilnError;
use std::time::Duration;

#[test]
fn test_parse_complete_config() {
    let yaml = r#"
name: widget
usage: Build the widget
interpreter: [bash, -c]

config:
  clean:
    dist: dist
  uglify:
    kind: minify
    js:
      src: dist/app.js
      dest: dist/app.min.js

tasks:
  dist-js:
    description: Build scripts
    run: ['clean:dist', uglify]
  default: dist-js
"#;

    let config = parse_config(yaml).unwrap();
    validate_config(&config).unwrap();

    assert_eq!(config.name, Some("widget".to_string()));
    assert_eq!(config.usage, Some("Build the widget".to_string()));
    assert_eq!(
        config.interpreter,
        Some(vec!["bash".to_string(), "-c".to_string()])
    );

    let names: Vec<&str> = config.tasks.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["dist-js", "default"]);
    assert_eq!(config.tasks[0].1.description.as_deref(), Some("Build scripts"));
    assert_eq!(config.tasks[1].1.run, vec!["dist-js".to_string()]);
}

#[test]
fn test_parse_config_from_file() {
    let (_temp_dir, config_path) = create_test_config(
        r#"
config:
  exec:
    hello: echo hello
"#,
    );

    let config = parse_config_file(&config_path).unwrap();
    assert!(config.config.get("exec").is_some());
}

#[test]
fn test_find_config_from_subdirectory() {
    let (_temp_dir, config_path, sub_dir) = create_test_config_in_subdir("tasks: {}\n");
    assert_eq!(find_config_file_from(sub_dir).unwrap(), config_path);
}

#[test]
fn test_invalid_yaml() {
    let result = parse_config("tasks: [unclosed\n");
    assert!(matches!(result, Err(KilnError::Yaml(_))));
}

#[test]
fn test_unknown_kind_is_rejected() {
    let config = parse_config(
        r#"
config:
  sass:
    kind: compile-sass
    core: {src: a.scss}
"#,
    )
    .unwrap();
    let store = kiln::config::build_store(&config, std::path::Path::new(".")).unwrap();

    assert!(matches!(
        action_sections(&store),
        Err(ConfigError::UnknownKind { ref section, ref kind })
            if section == "sass" && kind == "compile-sass"
    ));
}

#[test]
fn test_demo_sections() {
    let (_, store, registry) = load(&demo_config());

    let sections = action_sections(&store).unwrap();
    let kinds: Vec<(&str, ActionKind)> = sections
        .iter()
        .map(|s| (s.name.as_str(), s.kind))
        .collect();
    assert!(kinds.contains(&("jshint", ActionKind::Lint)));
    assert!(kinds.contains(&("less", ActionKind::CompileStyle)));
    assert!(kinds.contains(&("cssmin", ActionKind::Minify)));
    assert!(kinds.contains(&("compress", ActionKind::Archive)));
    assert!(kinds.contains(&("exec", ActionKind::Exec)));
    assert!(!kinds.iter().any(|(name, _)| *name == "browsers" || *name == "watch"));

    assert!(registry.contains("jekyll:github"));
    assert!(registry.contains("prep-release"));
}

#[test]
fn test_demo_release_plan() {
    let (_, store, registry) = load(&demo_config());
    let handlers = HandlerTable::builtin();
    let ctx = Context::new().with_verbosity(Verbosity::Silent);
    let runner = Runner::new(&store, &registry, &handlers, &ctx);

    let labels: Vec<String> = runner
        .plan("prep-release")
        .unwrap()
        .iter()
        .map(|leaf| leaf.label())
        .collect();
    assert_eq!(
        labels,
        vec![
            "clean:dist",
            "concat:js",
            "concat:colResizable",
            "uglify:js",
            "uglify:colResizable",
            "copy:less",
            "less:compileCore",
            "autoprefixer:core",
            "csscomb:dist",
            "cssmin:minifyCore",
            "clean:docs",
            "copy:docs",
            "jekyll:docs",
            "htmllint:site",
            "bootlint:site",
            "jekyll:github",
            "compress:main",
        ]
    );
}

#[test]
fn test_demo_templates_expand() {
    let (_, store, _) = load(&demo_config());

    assert_eq!(
        store.expand_path("compress.main.options.archive").unwrap(),
        ConfigNode::from("bootstrap-semi-auto-table-1.0.0-dist.zip")
    );

    let browsers = store.expand_path("autoprefixer.options.browsers").unwrap();
    let list = browsers.string_list().unwrap();
    assert_eq!(list.first().map(String::as_str), Some("Android 2.3"));
    assert_eq!(list.len(), 8);
}

#[test]
fn test_demo_watch_bindings() {
    let (_, store, _) = load(&demo_config());

    let bindings = load_bindings(&store, None).unwrap();
    let names: Vec<&str> = bindings.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["src", "less"]);

    let src = &bindings[0];
    assert_eq!(src.files, vec!["src/js/*.js".to_string()]);
    assert_eq!(
        src.tasks,
        vec!["jshint:core".to_string(), "concat".to_string()]
    );
    assert_eq!(src.debounce, Duration::from_millis(100));
    assert!(src.matches(std::path::Path::new("src/js/semi-auto-table.js")));
    assert!(!src.matches(std::path::Path::new("src/less/table.less")));

    let only = load_bindings(&store, Some("less")).unwrap();
    assert_eq!(only.len(), 1);
    assert_eq!(only[0].tasks, vec!["less".to_string()]);
}
