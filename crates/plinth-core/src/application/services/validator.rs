//! Batch blueprint validation: every problem is collected before any action runs.

use crate::application::services::PathResolver;
use crate::domain::{
    Blueprint, DomainValidator, ExecutionContext, ValidationIssue, ValidationReport, path_key,
};

pub struct BlueprintValidator;

impl BlueprintValidator {
    /// Structural checks plus a catalog check of every static path key. A
    /// defined key must also resolve to at least one path inside the
    /// module's root.
    ///
    /// Keys assembled from `{{…}}` placeholders are only known after
    /// expansion and are not checked here.
    pub fn validate(
        blueprint: &Blueprint,
        ctx: &ExecutionContext,
        resolver: &PathResolver,
    ) -> Result<(), ValidationReport> {
        let mut report = ValidationReport::new(&blueprint.id);
        report.extend(DomainValidator::validate_blueprint(blueprint));

        let scope = &ctx.module().scope;
        let structure = ctx.structure();

        for (index, action) in blueprint.actions.iter().enumerate() {
            let Some(path) = action.path_field() else {
                continue;
            };
            for reference in path_key::find_key_references(path) {
                if reference.is_deferred() {
                    continue;
                }
                if !resolver.is_defined_key(reference.key, scope, structure) {
                    report.push(ValidationIssue::action(
                        index,
                        format!(
                            "{}: path key '{}' is not defined in scope '{}' for {} projects",
                            action.kind(),
                            reference.key,
                            scope,
                            structure
                        ),
                    ));
                    continue;
                }

                let resolution = resolver.resolve(reference.key, ctx);
                if resolution.is_empty() {
                    let dropped: Vec<&str> =
                        resolution.dropped.iter().map(|p| p.as_str()).collect();
                    report.push(ValidationIssue::action(
                        index,
                        format!(
                            "{}: path key '{}' resolves to no path inside module root '{}'{}",
                            action.kind(),
                            reference.key,
                            ctx.context_root(),
                            if dropped.is_empty() {
                                String::new()
                            } else {
                                format!(" (outside: {})", dropped.join(", "))
                            }
                        ),
                    ));
                }
            }
        }

        report.into_result()
    }
}
