//! Shared test helpers for `callbook_core` integration tests.

#![allow(unreachable_pub)]

use callbook_core::{
    AliasMetadata, AliasRegistry, MemoryStore, TemplateRegistry, detect_parameters,
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

/// A literal address made of 40 copies of `c`.
#[allow(dead_code)]
pub fn addr(c: char) -> String {
    format!("0x{}", c.to_string().repeat(40))
}

/// Fresh registries sharing one in-memory store.
#[allow(dead_code)]
pub fn memory_registries() -> (
    MemoryStore,
    TemplateRegistry<MemoryStore>,
    AliasRegistry<MemoryStore>,
) {
    let store = MemoryStore::new();
    let templates = TemplateRegistry::open(store.clone()).expect("open templates");
    let aliases = AliasRegistry::open(store.clone()).expect("open aliases");
    (store, templates, aliases)
}

/// Add a template whose parameters are detected from its body.
#[allow(dead_code)]
pub fn add_detected(templates: &mut TemplateRegistry<MemoryStore>, name: &str, body: &str) {
    templates
        .add(name, detect_parameters(body), body, None)
        .unwrap_or_else(|e| panic!("add template {name}: {e}"));
}

/// Register `alias` → `address` with no metadata.
#[allow(dead_code)]
pub fn add_alias(aliases: &mut AliasRegistry<MemoryStore>, alias: &str, address: &str) {
    aliases
        .add(alias, address, AliasMetadata::default())
        .unwrap_or_else(|e| panic!("add alias {alias}: {e}"));
}
