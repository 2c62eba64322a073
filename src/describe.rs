//! One-line, human-readable summaries of operations for progress output.

use colored::Colorize;

use crate::operation::Operation;

/// Describe an operation, highlighting identifiers in cyan.
pub fn describe(op: &Operation) -> String {
    render(op, |name| name.cyan().to_string())
}

fn render(op: &Operation, hl: impl Fn(&str) -> String) -> String {
    let name = |value: &Option<String>| hl(value.as_deref().unwrap_or("?"));

    match op {
        Operation::CreateTable(ct) => format!("Creating table {}", name(&ct.name)),
        Operation::DropTable(dt) => format!("Dropping table {}", name(&dt.name)),
        Operation::RenameTable(rt) => {
            format!("Renaming table {} to {}", name(&rt.from), name(&rt.to))
        }
        Operation::AddColumn(ac) => format!(
            "Adding column {} to table {}",
            name(&ac.column),
            name(&ac.table)
        ),
        Operation::DropColumn(dc) => format!(
            "Dropping column {} from table {}",
            name(&dc.column),
            name(&dc.table)
        ),
        Operation::RenameColumn(rc) => format!(
            "Renaming column {} to {} on table {}",
            name(&rc.from),
            name(&rc.to),
            name(&rc.table)
        ),
        Operation::AlterColumn(ac) => format!(
            "Altering column {} on table {}",
            name(&ac.column),
            name(&ac.table)
        ),
        Operation::AddIndex(ai) => format!(
            "Adding {} {} on table {}",
            if ai.is_unique() { "unique index" } else { "index" },
            name(&ai.name),
            name(&ai.table)
        ),
        Operation::DropIndex(di) => match &di.table {
            Some(_) => format!(
                "Dropping index {} from table {}",
                name(&di.name),
                name(&di.table)
            ),
            None => format!("Dropping index {}", name(&di.name)),
        },
        Operation::AddForeignKey(fk) => format!(
            "Adding foreign key {} on table {}",
            name(&fk.name),
            name(&fk.table)
        ),
        Operation::DropForeignKey(fk) => format!(
            "Dropping foreign key {} from table {}",
            name(&fk.name),
            name(&fk.table)
        ),
        Operation::Raw(_) => "Executing raw SQL".to_string(),
        Operation::Unknown(kind) => format!("Executing unknown operation: {}", kind),
    }
}
