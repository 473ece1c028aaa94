use crate::core::metrics::sort_by_complexity;
use crate::core::{CorpusModel, FunctionRecord};
use crate::database::{ColumnRole, TableSchema};
use crate::dependencies::IncludeTarget;
use crate::security::Severity;
use colored::*;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use std::io::Write;

/// Rows shown per section in the human-readable views.
const TOP_FUNCTIONS: usize = 10;
const TOP_FINDINGS: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
    Terminal,
}

pub trait OutputWriter {
    fn write_corpus(&mut self, corpus: &CorpusModel) -> anyhow::Result<()>;
}

pub struct JsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for JsonWriter<W> {
    fn write_corpus(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, corpus)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

pub struct MarkdownWriter<W: Write> {
    writer: W,
    high_complexity_threshold: u32,
}

impl<W: Write> MarkdownWriter<W> {
    pub fn new(writer: W, high_complexity_threshold: u32) -> Self {
        Self {
            writer,
            high_complexity_threshold,
        }
    }
}

impl<W: Write> OutputWriter for MarkdownWriter<W> {
    fn write_corpus(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        self.write_header(corpus)?;
        self.write_summary(corpus)?;
        self.write_migration(corpus)?;
        self.write_tables(corpus)?;
        self.write_security(corpus)?;
        self.write_complex_functions(corpus)?;
        self.write_dependencies(corpus)?;
        self.write_warnings(corpus)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> MarkdownWriter<W> {
    fn write_header(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        writeln!(self.writer, "# Legacy Codebase Analysis")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "Root: `{}`", corpus.root.display())?;
        writeln!(
            self.writer,
            "Generated: {}",
            corpus.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(self.writer, "Rule set: {}", corpus.ruleset_version)?;
        if !corpus.complete {
            writeln!(
                self.writer,
                "\n> **Incomplete run**: {} files were not analysed.",
                corpus.skipped_files.len()
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_summary(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        let complexity = &corpus.summary.complexity;
        let migration = &corpus.summary.migration;

        writeln!(self.writer, "## Summary")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "| Metric | Value |")?;
        writeln!(self.writer, "|--------|-------|")?;
        let rows = [
            ("Files", migration.total_files.to_string()),
            ("Lines", migration.total_lines.to_string()),
            ("Mixed PHP/HTML files", migration.mixed_files.to_string()),
            ("Functions", complexity.total_functions.to_string()),
            ("Average complexity", format!("{:.1}", complexity.average_complexity)),
            ("Max complexity", complexity.max_complexity.to_string()),
            (
                "Functions over threshold",
                complexity.high_complexity_count.to_string(),
            ),
            ("Tables", corpus.tables.len().to_string()),
            ("Security findings", corpus.security_findings.len().to_string()),
            ("Include edges", corpus.dependencies.len().to_string()),
            ("Warnings", corpus.warnings.len().to_string()),
        ];
        for (metric, value) in rows {
            writeln!(self.writer, "| {metric} | {value} |")?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_migration(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        let migration = &corpus.summary.migration;
        writeln!(self.writer, "## Migration Assessment")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "Overall: **{}**", migration.rating)?;
        writeln!(self.writer)?;
        for factor in &migration.factors {
            writeln!(self.writer, "- {factor}")?;
        }
        if !migration.entry_points.is_empty() {
            writeln!(self.writer)?;
            writeln!(self.writer, "### Entry Points")?;
            writeln!(self.writer)?;
            for entry in &migration.entry_points {
                writeln!(self.writer, "- `{entry}`")?;
            }
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_tables(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        if corpus.tables.is_empty() {
            return Ok(());
        }

        writeln!(self.writer, "## Database Tables")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "| Table | Columns | Keys | Operations | Queries |")?;
        writeln!(self.writer, "|-------|---------|------|------------|---------|")?;
        for schema in corpus.tables.values() {
            writeln!(
                self.writer,
                "| {} | {} | {} | {} | {} |",
                schema.table_name,
                join(schema.columns.iter()),
                key_columns(schema),
                join(schema.operations.iter()),
                schema.query_count
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_security(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        if corpus.security_findings.is_empty() {
            return Ok(());
        }

        writeln!(
            self.writer,
            "## Security Findings ({})",
            corpus.security_findings.len()
        )?;
        writeln!(self.writer)?;
        for (severity, count) in &corpus.summary.security.by_severity {
            writeln!(self.writer, "- {severity}: {count}")?;
        }
        writeln!(self.writer)?;
        writeln!(self.writer, "| Severity | Rule | Location | Snippet |")?;
        writeln!(self.writer, "|----------|------|----------|---------|")?;
        let mut findings: Vec<_> = corpus.security_findings.iter().collect();
        findings.sort_by(|a, b| b.severity.cmp(&a.severity));
        for finding in findings.iter().take(TOP_FINDINGS) {
            writeln!(
                self.writer,
                "| {} | {} | `{}:{}` | `{}` |",
                finding.severity,
                finding.rule_id,
                finding.file,
                finding.line,
                finding.snippet.replace('|', "\\|").replace('`', "'")
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_complex_functions(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        let complex: Vec<_> = sort_by_complexity(corpus.functions().collect())
            .into_iter()
            .filter(|(_, f)| f.is_complex(self.high_complexity_threshold))
            .take(TOP_FUNCTIONS)
            .collect();
        if complex.is_empty() {
            return Ok(());
        }

        writeln!(self.writer, "## Complex Functions")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "| Function | Location | Complexity | Returns |")?;
        writeln!(self.writer, "|----------|----------|------------|---------|")?;
        for (file, function) in complex {
            writeln!(
                self.writer,
                "| {} | `{}:{}` | {} | {} |",
                function.qualified_name(),
                file,
                function.line_start,
                function.cyclomatic_complexity,
                return_shape(function)
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_dependencies(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        if corpus.dependencies.is_empty() {
            return Ok(());
        }

        writeln!(self.writer, "## Dependencies")?;
        writeln!(self.writer)?;
        let symbolic: Vec<_> = corpus
            .dependencies
            .iter()
            .filter(|e| matches!(e.target, IncludeTarget::Symbolic(_)))
            .collect();
        let missing = corpus
            .dependencies
            .iter()
            .filter(|e| e.target.resolved().is_some() && !e.in_corpus)
            .count();
        writeln!(
            self.writer,
            "{} include edges, {} computed targets, {} targets outside the corpus.",
            corpus.dependencies.len(),
            symbolic.len(),
            missing
        )?;
        writeln!(self.writer)?;

        if !corpus.dependency_cycles.is_empty() {
            writeln!(self.writer, "### Include Cycles")?;
            writeln!(self.writer)?;
            for cycle in &corpus.dependency_cycles {
                writeln!(self.writer, "- {}", cycle.join(" -> "))?;
            }
            writeln!(self.writer)?;
        }
        if !symbolic.is_empty() {
            writeln!(self.writer, "### Computed Includes")?;
            writeln!(self.writer)?;
            for edge in symbolic {
                writeln!(
                    self.writer,
                    "- `{}:{}` {}",
                    edge.source_file, edge.line, edge.target
                )?;
            }
            writeln!(self.writer)?;
        }
        Ok(())
    }

    fn write_warnings(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        if corpus.warnings.is_empty() {
            return Ok(());
        }

        writeln!(self.writer, "## Warnings ({})", corpus.warnings.len())?;
        writeln!(self.writer)?;
        for warning in &corpus.warnings {
            let location = match (&warning.file, warning.line) {
                (Some(file), Some(line)) => format!("`{file}:{line}` "),
                (Some(file), None) => format!("`{file}` "),
                _ => String::new(),
            };
            writeln!(
                self.writer,
                "- {location}{}: {}",
                warning.kind, warning.message
            )?;
        }
        Ok(())
    }
}

pub struct TerminalWriter<W: Write> {
    writer: W,
    high_complexity_threshold: u32,
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(writer: W, high_complexity_threshold: u32) -> Self {
        Self {
            writer,
            high_complexity_threshold,
        }
    }
}

impl<W: Write> OutputWriter for TerminalWriter<W> {
    fn write_corpus(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        self.print_header(corpus)?;
        self.print_summary(corpus)?;
        self.print_tables(corpus)?;
        self.print_findings(corpus)?;
        self.print_hotspots(corpus)?;
        self.print_cycles(corpus)?;
        self.print_warnings(corpus)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> TerminalWriter<W> {
    fn print_header(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        writeln!(self.writer, "{}", "Legacy Codebase Analysis".bold().blue())?;
        writeln!(self.writer, "{}", "========================".blue())?;
        writeln!(self.writer, "  root: {}", corpus.root.display())?;
        if !corpus.complete {
            writeln!(
                self.writer,
                "  {} {} files not analysed",
                "incomplete:".yellow().bold(),
                corpus.skipped_files.len()
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn print_summary(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        let complexity = &corpus.summary.complexity;
        let migration = &corpus.summary.migration;
        let rating = match migration.rating.to_string() {
            r if migration.rating >= crate::core::MigrationRating::High => r.red().bold(),
            r if migration.rating == crate::core::MigrationRating::Medium => r.yellow().bold(),
            r => r.green().bold(),
        };

        writeln!(self.writer, "{}", "Summary".bold())?;
        writeln!(
            self.writer,
            "  files: {} ({} lines, {} mixed)",
            migration.total_files, migration.total_lines, migration.mixed_files
        )?;
        writeln!(
            self.writer,
            "  functions: {} (avg complexity {:.1}, max {})",
            complexity.total_functions, complexity.average_complexity, complexity.max_complexity
        )?;
        writeln!(
            self.writer,
            "  tables: {}  findings: {}  include edges: {}",
            corpus.tables.len(),
            corpus.security_findings.len(),
            corpus.dependencies.len()
        )?;
        writeln!(self.writer, "  migration: {rating}")?;
        for factor in &migration.factors {
            writeln!(self.writer, "    - {factor}")?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn print_tables(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        if corpus.tables.is_empty() {
            return Ok(());
        }

        let mut table = new_table(vec!["Table", "Columns", "Keys", "Queries"]);
        for schema in corpus.tables.values() {
            table.add_row(vec![
                schema.table_name.clone(),
                join(schema.columns.iter()),
                key_columns(schema),
                schema.query_count.to_string(),
            ]);
        }
        writeln!(self.writer, "{}", "Database Tables".bold())?;
        writeln!(self.writer, "{table}")?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn print_findings(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        if corpus.security_findings.is_empty() {
            return Ok(());
        }

        let mut findings: Vec<_> = corpus.security_findings.iter().collect();
        findings.sort_by(|a, b| b.severity.cmp(&a.severity));

        let mut table = new_table(vec!["Severity", "Rule", "Location", "Snippet"]);
        for finding in findings.iter().take(TOP_FINDINGS) {
            table.add_row(vec![
                finding.severity.to_string(),
                finding.rule_id.clone(),
                format!("{}:{}", finding.file, finding.line),
                finding.snippet.clone(),
            ]);
        }
        let critical = findings
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .count();
        writeln!(
            self.writer,
            "{} ({} total, {} critical)",
            "Security Findings".bold(),
            findings.len(),
            critical.to_string().red()
        )?;
        writeln!(self.writer, "{table}")?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn print_hotspots(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        let threshold = self.high_complexity_threshold;
        let hotspots: Vec<_> = sort_by_complexity(corpus.functions().collect())
            .into_iter()
            .filter(|(_, f)| f.is_complex(threshold))
            .take(TOP_FUNCTIONS)
            .collect();
        if hotspots.is_empty() {
            return Ok(());
        }

        writeln!(
            self.writer,
            "{} (complexity over {threshold})",
            "Complexity Hotspots".bold().yellow()
        )?;
        for (i, (file, function)) in hotspots.iter().enumerate() {
            writeln!(
                self.writer,
                "  {}. {}:{} {}() - cyclomatic {}",
                i + 1,
                file,
                function.line_start,
                function.qualified_name().yellow(),
                function.cyclomatic_complexity.to_string().red()
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn print_cycles(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        if corpus.dependency_cycles.is_empty() {
            return Ok(());
        }
        writeln!(self.writer, "{}", "Include Cycles".bold())?;
        for cycle in &corpus.dependency_cycles {
            writeln!(self.writer, "  {}", cycle.join(" -> "))?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn print_warnings(&mut self, corpus: &CorpusModel) -> anyhow::Result<()> {
        if corpus.warnings.is_empty() {
            return Ok(());
        }
        writeln!(
            self.writer,
            "{} ({})",
            "Warnings".bold().yellow(),
            corpus.warnings.len()
        )?;
        for warning in &corpus.warnings {
            let file = warning.file.as_deref().unwrap_or("-");
            writeln!(self.writer, "  {file}: {} ({})", warning.message, warning.kind)?;
        }
        Ok(())
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn join<T: ToString>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

fn key_columns(schema: &TableSchema) -> String {
    join(schema.column_roles.iter().map(|(column, role)| match role {
        ColumnRole::PrimaryKeyLike => format!("{column} (pk)"),
        ColumnRole::ForeignKeyLike => format!("{column} (fk)"),
    }))
}

fn return_shape(function: &FunctionRecord) -> String {
    if function.return_keys.is_empty() {
        function.return_type.to_string()
    } else {
        format!("{} {{{}}}", function.return_type, join(function.return_keys.iter()))
    }
}

pub fn create_writer<'w>(
    format: OutputFormat,
    out: Box<dyn Write + 'w>,
    high_complexity_threshold: u32,
) -> Box<dyn OutputWriter + 'w> {
    match format {
        OutputFormat::Json => Box::new(JsonWriter::new(out)),
        OutputFormat::Markdown => Box::new(MarkdownWriter::new(out, high_complexity_threshold)),
        OutputFormat::Terminal => Box::new(TerminalWriter::new(out, high_complexity_threshold)),
    }
}
