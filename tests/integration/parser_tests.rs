use std::path::Path;

use repoindex::language::Language;
use repoindex::parser::ParserRegistry;

const SAMPLES: &[(&str, &str)] = &[
    (
        "service.py",
        "import os\n\nclass Service(Base):\n    \"\"\"Runs jobs.\"\"\"\n    async def run(self, *jobs, **opts):\n        return jobs\n\ndef main():\n    Service().run()\n",
    ),
    (
        "src/app.ts",
        "import { api } from './api';\nexport class App extends Base {\n  start(port: number): void {}\n}\nexport const boot = async () => new App();\n",
    ),
    (
        "cmd/main.go",
        "package main\n\nimport (\n\t\"fmt\"\n\t\"example.com/app/store\"\n)\n\ntype Server struct{}\n\nfunc (s *Server) Serve() {}\n\nfunc main() { fmt.Println(store.Name) }\n",
    ),
    (
        "src/lib.rs",
        "use crate::store::Store;\nmod store;\n\npub struct Engine;\n\nimpl Engine {\n    pub fn run(&self) {}\n}\n\npub fn start() {}\n",
    ),
    (
        "src/com/acme/App.java",
        "package com.acme;\nimport java.util.List;\npublic class App extends Base {\n  public void run(String[] args) {}\n}\n",
    ),
    (
        "src/main.c",
        "#include <stdio.h>\n#include \"util.h\"\nint add(int a, int b) { return a + b; }\n",
    ),
];

#[test]
fn test_reparse_is_identical_for_every_language() {
    let registry = ParserRegistry::new();
    for (path, source) in SAMPLES {
        let path = Path::new(path);
        let language = Language::detect(path).expect("sample language").as_str();

        let first = registry.parse(source, path, language);
        let second = registry.parse(source, path, language);
        assert!(first.is_ok(), "{}: {:?}", path.display(), first.parse_error);
        assert_eq!(first, second, "{} parsed differently twice", path.display());
        assert!(
            !first.functions.is_empty() || !first.classes.is_empty(),
            "{} produced no entities",
            path.display()
        );
    }
}

#[test]
fn test_imports_stay_raw() {
    let registry = ParserRegistry::new();
    let result = registry.parse(SAMPLES[0].1, Path::new("service.py"), "python");
    assert_eq!(result.imports, vec!["import os"]);

    let result = registry.parse(SAMPLES[5].1, Path::new("src/main.c"), "c");
    assert_eq!(result.imports.len(), 2);
    assert!(result.imports.iter().all(|i| i.starts_with("#include")));
}

#[test]
fn test_methods_inside_their_class_are_covered() {
    let registry = ParserRegistry::new();
    let result = registry.parse(SAMPLES[0].1, Path::new("service.py"), "python");
    let uncovered: Vec<_> = result.uncovered_functions().map(|f| f.name.as_str()).collect();
    assert_eq!(uncovered, vec!["main"]);

    let service = &result.classes[0];
    assert_eq!(service.methods, vec!["run"]);
    assert_eq!(service.bases, vec!["Base"]);
    assert_eq!(service.docstring.as_deref(), Some("Runs jobs."));
}

#[test]
fn test_failures_are_values_not_panics() {
    let registry = ParserRegistry::new();

    let broken = registry.parse("def broken(:\n", Path::new("x.py"), "python");
    assert!(broken.parse_error.is_some());
    assert!(broken.functions.is_empty() && broken.classes.is_empty() && broken.imports.is_empty());

    let unknown = registry.parse("<?php echo 1;", Path::new("x.php"), "php");
    assert_eq!(unknown.parse_error.as_deref(), Some("Unsupported language: php"));
}
