use protogen_core::diagnostics::Diagnostic;
use protogen_core::plugin::PluginRegistry;

use crate::walk::UpdateReport;

pub fn print_update_report(report: &UpdateReport) {
    let declarations: usize = report.results.iter().map(|r| r.generated.len()).sum();
    let deleted: usize = report.results.iter().map(|r| r.empty.len()).sum();

    for change in &report.changed {
        let verb = match (report.dry_run, change.created) {
            (true, true) => "📝 Would create",
            (true, false) => "📝 Would update",
            (false, true) => "🆕 Created",
            (false, false) => "✅ Updated",
        };
        println!("{} {}", verb, change.path.display());
    }

    let diagnostics = report.diagnostics();
    if !diagnostics.is_empty() {
        println!();
        for diagnostic in &diagnostics {
            println!("⚠️  {}", format_diagnostic(diagnostic));
        }
    }

    println!();
    println!(
        "📊 {} directories, {} declarations, {} deleted, {} BUILD files {}",
        report.results.len(),
        declarations,
        deleted,
        report.changed.len(),
        if report.dry_run { "would change" } else { "changed" }
    );
    if !diagnostics.is_empty() {
        println!("   {} warnings", diagnostics.len());
    }
}

pub fn format_diagnostic(diagnostic: &Diagnostic) -> String {
    let tag = match diagnostic {
        Diagnostic::UnresolvedImport { .. } => "unresolved",
        Diagnostic::AmbiguousImport { .. } => "ambiguous",
        Diagnostic::AdoptedUnitMismatch { .. } => "mismatch",
        Diagnostic::SkippedSourceFile { .. } => "skipped",
    };
    format!("[{}] {}", tag, diagnostic)
}

pub fn print_plugins(registry: &PluginRegistry) {
    println!("🔌 Registered plugins:");
    for plugin in registry.plugins() {
        let deps: Vec<String> = plugin.deps.iter().map(ToString::to_string).collect();
        println!(
            "   {:<10} {:<12} {:<10} {}{}{}",
            plugin.name,
            plugin.language,
            plugin.output_kind,
            plugin.naming,
            if deps.is_empty() {
                String::new()
            } else {
                format!("  deps: {}", deps.join(", "))
            },
            if plugin.merge_directories { "  (merged)" } else { "" }
        );
    }
    println!();
    println!("📦 Rule kinds: {}", registry.rule_kinds().join(", "));
}
