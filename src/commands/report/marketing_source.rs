use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::model::RawMarketingRow;

const REQUIRED_HEADERS: [&str; 3] = ["month", "channel", "spend_amount"];

pub fn load_marketing_csv(path: &Path) -> Result<Vec<RawMarketingRow>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open marketing csv: {}", path.display()))?;
    let rows = read_marketing_rows(file)
        .with_context(|| format!("failed to read marketing csv: {}", path.display()))?;

    info!(path = %path.display(), rows = rows.len(), "loaded marketing spend rows");
    Ok(rows)
}

/// Reads every data row as text; typing is left to the normalizer.
pub fn read_marketing_rows<R: Read>(reader: R) -> Result<Vec<RawMarketingRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .context("marketing csv must have a header row")?
        .clone();
    let columns = HeaderIndex::from_headers(&headers)?;

    let mut rows = Vec::new();
    for (line_index, record) in csv_reader.records().enumerate() {
        let record =
            record.with_context(|| format!("malformed csv record at line {}", line_index + 2))?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        rows.push(RawMarketingRow {
            month: columns.get(&record, "month").to_string(),
            channel: columns.get(&record, "channel").to_string(),
            spend_amount: columns.get(&record, "spend_amount").to_string(),
        });
    }

    Ok(rows)
}

struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let mut positions = HashMap::new();
        for (index, header) in headers.iter().enumerate() {
            let name = header.trim_start_matches('\u{feff}').trim().to_ascii_lowercase();
            positions.entry(name).or_insert(index);
        }

        for required in REQUIRED_HEADERS {
            if !positions.contains_key(required) {
                bail!("marketing csv missing required header: {required}");
            }
        }

        Ok(Self { positions })
    }

    /// Short rows yield empty strings, which the normalizer treats as missing.
    fn get<'a>(&self, record: &'a csv::StringRecord, name: &str) -> &'a str {
        self.positions
            .get(name)
            .and_then(|index| record.get(*index))
            .unwrap_or("")
    }
}
