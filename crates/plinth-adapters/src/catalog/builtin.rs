//! Key sets that ship with Plinth.
//!
//! The `core` scope covers the layout conventions every first-party module
//! relies on. Marketplace scopes bring their own `<scope>.toml` catalogs.

use plinth_core::domain::{KeyDefinition, KeyDefinitions, StructureKind};

/// Scope of the first-party module catalog.
pub const CORE_SCOPE: &str = "core";

/// Every built-in catalog, one per scope.
pub fn builtin_keys() -> Vec<KeyDefinitions> {
    vec![core()]
}

fn core() -> KeyDefinitions {
    KeyDefinitions::new(CORE_SCOPE)
        // Semantic keys: fan out across monorepo apps.
        .with_key(
            "apps.frontend.components",
            KeyDefinition::new("src/components").described("UI components of each frontend app"),
        )
        .with_key(
            "apps.frontend.pages",
            KeyDefinition::new("src/pages").described("Routed pages of each frontend app"),
        )
        .with_key("apps.frontend.styles", KeyDefinition::new("src/styles"))
        .with_key(
            "apps.backend.routes",
            KeyDefinition::new("src/routes").described("HTTP route modules of each backend app"),
        )
        .with_key("apps.backend.services", KeyDefinition::new("src/services"))
        .with_key(
            "apps.all.root",
            KeyDefinition::new(".").described("Root directory of every frontend and backend app"),
        )
        .with_key("apps.all.env", KeyDefinition::new(".env"))
        // Module-local keys: resolve inside the target package.
        .with_key(
            "auth.config",
            KeyDefinition::new("src/auth.config.ts").described("Authentication configuration"),
        )
        .with_key("auth.middleware", KeyDefinition::new("src/middleware.ts"))
        .with_key(
            "db.schema",
            KeyDefinition::new("prisma/schema.prisma").described("Database schema"),
        )
        .with_key("db.client", KeyDefinition::new("src/lib/db.ts"))
        .with_key("lib.utils", KeyDefinition::new("src/lib/utils.ts"))
        .with_key("config.env", KeyDefinition::new(".env"))
        .with_key("config.typescript", KeyDefinition::new("tsconfig.json"))
        .with_key("app.entry", KeyDefinition::new("src/index.ts").only(StructureKind::SingleApp))
        .with_key(
            "workspace.packages",
            KeyDefinition::new("packages")
                .only(StructureKind::Monorepo)
                .described("Shared workspace packages directory"),
        )
}
