use anyhow::Result;

use crate::helpers::test_harness::{TestHarness, REPO_ID};

#[tokio::test]
async fn test_python_round_trip_from_disk() -> Result<()> {
    let harness = TestHarness::new()?;
    harness.create_test_file("pkg/__init__.py", "")?;
    harness.create_test_file("pkg/a.py", "import os\nfrom .b import value\n\ndef run():\n    return value\n")?;
    harness.create_test_file("pkg/b.py", "value = 1\n")?;

    let graph = harness.indexer().analyze(REPO_ID).await?;
    let a = &graph.graph["pkg/a.py"];
    assert_eq!(a.imports, vec!["pkg/b.py"]);
    assert_eq!(a.external_imports, vec!["os"]);
    assert_eq!(graph.graph["pkg/b.py"].imported_by, vec!["pkg/a.py"]);
    Ok(())
}

#[tokio::test]
async fn test_nearest_alias_scope_wins() -> Result<()> {
    let harness = TestHarness::new()?;
    harness.create_test_file(
        "tsconfig.json",
        "{\n  // root aliases\n  \"compilerOptions\": { \"paths\": { \"@/*\": [\"src/*\"] } },\n}\n",
    )?;
    harness.create_test_file(
        "frontend/tsconfig.json",
        "{ /* app */ \"compilerOptions\": { \"paths\": { \"@/*\": [\"app/*\"], } } }",
    )?;
    harness.create_test_file("frontend/src/x.ts", "import { util } from '@/util';\nexport const x = util;\n")?;
    harness.create_test_file("frontend/app/util.ts", "export const util = 1;\n")?;
    harness.create_test_file("src/util.ts", "export const util = 2;\n")?;

    let graph = harness.indexer().analyze(REPO_ID).await?;
    assert_eq!(graph.graph["frontend/src/x.ts"].imports, vec!["frontend/app/util.ts"]);
    assert!(graph.graph["src/util.ts"].imported_by.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unresolved_imports_become_external() -> Result<()> {
    let harness = TestHarness::new()?;
    harness.create_test_file(
        "web/main.js",
        "const express = require('express');\nconst missing = require('./missing');\nconst local = require('./local');\n",
    )?;
    harness.create_test_file("web/local.js", "module.exports = {};\n")?;

    let graph = harness.indexer().analyze(REPO_ID).await?;
    let main = &graph.graph["web/main.js"];
    assert_eq!(main.imports, vec!["web/local.js"]);
    assert!(main.external_imports.contains(&"express".to_string()));
    assert!(main.external_imports.contains(&"./missing".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_every_edge_points_at_an_indexed_file() -> Result<()> {
    let harness = TestHarness::new()?;
    harness.create_test_file("go.mod", "module example.com/shop\n")?;
    harness.create_test_file(
        "cmd/api/main.go",
        "package main\n\nimport (\n\t\"net/http\"\n\t\"example.com/shop/internal/cart\"\n)\n\nfunc main() { http.ListenAndServe(\":80\", cart.Handler()) }\n",
    )?;
    harness.create_test_file("internal/cart/cart.go", "package cart\n\nfunc Handler() {}\n")?;
    harness.create_test_file("src/lib.rs", "mod store;\nuse crate::store::Store;\n")?;
    harness.create_test_file("src/store.rs", "pub struct Store;\n")?;

    let graph = harness.indexer().analyze(REPO_ID).await?;
    for (path, deps) in &graph.graph {
        for target in &deps.imports {
            assert!(graph.graph.contains_key(target), "{} -> {} is dangling", path, target);
            assert!(graph.graph[target].imported_by.contains(path));
        }
    }
    assert_eq!(graph.graph["cmd/api/main.go"].imports, vec!["internal/cart/cart.go"]);
    assert_eq!(graph.graph["src/lib.rs"].imports, vec!["src/store.rs"]);

    let stats = graph.stats();
    assert_eq!(stats.total_internal_dependencies, 2);
    Ok(())
}
