use tabled::{settings::Style, Table, Tabled};

use crate::kind::RecordKind;

#[derive(Tabled)]
pub struct StatsRow {
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Records")]
    pub records: String,
}

#[derive(Tabled)]
pub struct IdRow {
    #[tabled(rename = "#")]
    pub position: usize,
    #[tabled(rename = "Identifier")]
    pub id: String,
    #[tabled(rename = "Link")]
    pub link: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<StatsRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(StatsRow {
            kind: label.to_string(),
            records: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(counts: &[(RecordKind, usize)]) -> String {
    let mut builder = TableBuilder::new();
    for (kind, count) in counts {
        builder.add_row(kind.as_str(), &count.to_string());
    }
    let total: usize = counts.iter().map(|(_, c)| c).sum();
    builder.add_row("total", &total.to_string());
    builder.build()
}

/// One page of identifiers, numbered from `offset`
pub fn id_table(kind: RecordKind, ids: &[String], offset: usize) -> String {
    if ids.is_empty() {
        return String::new();
    }
    let rows: Vec<IdRow> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| IdRow {
            position: offset + i + 1,
            id: id.clone(),
            link: format!("/{}/{}", kind.list_segment(), id),
        })
        .collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}
