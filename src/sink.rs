// src/sink.rs
//! Tags harvested records with calendar metadata and writes them out.

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Date32Array, StringArray, UInt64Array},
    datatypes::{DataType as ArrowDataType, Date32Type, Field, Schema as ArrowSchema},
    record_batch::RecordBatch,
};
use chrono::NaiveDate;
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use serde::Serialize;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::harvest::{FilterConfig, Harvest, LogicalTable};

/// One exported row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationRow {
    #[serde(rename = "Manufacturer")]
    pub manufacturer: String,
    #[serde(rename = "Registrations")]
    pub registrations: u64,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Category")]
    pub category: String,
}

/// Yearly figures are dated to 1 January of their year.
pub fn year_start(year: &str) -> Result<NaiveDate> {
    let y: i32 = year
        .trim()
        .parse()
        .with_context(|| format!("year `{}` is not a number", year))?;
    NaiveDate::from_ymd_opt(y, 1, 1).with_context(|| format!("year `{}` out of range", year))
}

pub fn tag_records(filter: &FilterConfig, harvest: &Harvest) -> Result<Vec<RegistrationRow>> {
    let date = year_start(&filter.year)?;
    Ok(harvest
        .normalized
        .records
        .iter()
        .map(|r| RegistrationRow {
            manufacturer: r.entity.clone(),
            registrations: r.count,
            date,
            category: filter.category.clone(),
        })
        .collect())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    Ok(())
}

pub fn write_csv(path: impl AsRef<Path>, rows: &[RegistrationRow]) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let tmp = tmp_path(path);
    {
        let mut wtr = csv::Writer::from_path(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        for row in rows {
            wtr.serialize(row).context("writing csv row")?;
        }
        wtr.flush().context("flushing csv")?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("renaming `{}` → `{}`", tmp.display(), path.display()))
}

/// One year's raw month-wise table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearTable {
    pub year: String,
    pub table: LogicalTable,
}

/// Union of all headers, each label at its first-seen position.
fn union_header(tables: &[YearTable]) -> Vec<String> {
    let mut header: Vec<String> = Vec::new();
    for t in tables {
        for label in &t.table.header {
            if !header.contains(label) {
                header.push(label.clone());
            }
        }
    }
    header
}

/// Write raw month-wise tables as one CSV: the union of their headers plus a
/// trailing `Year` column. Cells missing from a row are left empty.
pub fn write_monthly_csv(path: impl AsRef<Path>, tables: &[YearTable]) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let header = union_header(tables);
    let tmp = tmp_path(path);
    {
        let mut wtr = csv::Writer::from_path(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        wtr.write_record(header.iter().map(String::as_str).chain(["Year"]))
            .context("writing csv header")?;
        for t in tables {
            // position of each of this table's columns in the union
            let slots: Vec<usize> = t
                .table
                .header
                .iter()
                .filter_map(|label| header.iter().position(|h| h == label))
                .collect();
            for row in &t.table.rows {
                let mut record = vec![""; header.len()];
                for (cell, &slot) in row.iter().zip(&slots) {
                    record[slot] = cell.as_str();
                }
                record.push(t.year.as_str());
                wtr.write_record(&record).context("writing csv row")?;
            }
        }
        wtr.flush().context("flushing csv")?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("renaming `{}` → `{}`", tmp.display(), path.display()))
}

fn schema() -> ArrowSchema {
    ArrowSchema::new(vec![
        Field::new("manufacturer", ArrowDataType::Utf8, false),
        Field::new("registrations", ArrowDataType::UInt64, false),
        Field::new("date", ArrowDataType::Date32, false),
        Field::new("category", ArrowDataType::Utf8, false),
    ])
}

pub fn write_parquet(path: impl AsRef<Path>, rows: &[RegistrationRow]) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let schema = Arc::new(schema());

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.manufacturer.as_str()),
        )),
        Arc::new(UInt64Array::from_iter_values(
            rows.iter().map(|r| r.registrations),
        )),
        Arc::new(Date32Array::from_iter_values(
            rows.iter().map(|r| Date32Type::from_naive_date(r.date)),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.category.as_str()),
        )),
    ];
    let batch =
        RecordBatch::try_new(schema.clone(), columns).context("building registrations batch")?;

    let tmp = tmp_path(path);
    let file = File::create(&tmp).with_context(|| format!("creating `{}`", tmp.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), schema, Some(props))
        .context("creating ArrowWriter")?;
    writer.write(&batch).context("writing registrations batch")?;
    writer.close().context("closing ArrowWriter")?;

    fs::rename(&tmp, path)
        .with_context(|| format!("renaming `{}` → `{}`", tmp.display(), path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::{NormalizedTable, Record};
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::tempdir;

    fn harvest(records: Vec<Record>) -> Harvest {
        Harvest {
            table: LogicalTable {
                header: vec!["Maker".into(), "TOTAL".into()],
                rows: vec![],
                page_rows: vec![],
            },
            normalized: NormalizedTable {
                entity_column: "Maker".into(),
                count_column: "TOTAL".into(),
                records,
                dropped_blank: 0,
                dropped_aggregate: 0,
            },
        }
    }

    fn sample() -> Vec<RegistrationRow> {
        let filter = FilterConfig::new("Maker", "2023", "TWO WHEELER");
        tag_records(
            &filter,
            &harvest(vec![
                Record {
                    entity: "HERO MOTOCORP".into(),
                    count: 5000,
                },
                Record {
                    entity: "HONDA, INDIA".into(),
                    count: 4000,
                },
            ]),
        )
        .unwrap()
    }

    #[test]
    fn test_tagging_dates_to_year_start() {
        let rows = sample();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(rows[1].category, "TWO WHEELER");
        assert!(year_start("20x4").is_err());
    }

    #[test]
    fn test_write_csv() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("out/data.csv");
        write_csv(&path, &sample())?;
        let text = fs::read_to_string(&path)?;
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Manufacturer,Registrations,Date,Category")
        );
        assert_eq!(lines.next(), Some("HERO MOTOCORP,5000,2023-01-01,TWO WHEELER"));
        assert_eq!(
            lines.next(),
            Some("\"HONDA, INDIA\",4000,2023-01-01,TWO WHEELER")
        );
        assert!(!tmp_path(&path).exists());
        Ok(())
    }

    #[test]
    fn test_write_parquet() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("data.parquet");
        write_parquet(&path, &sample())?;

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?.build()?;
        let total: usize = reader
            .map(|b| b.map(|b| b.num_rows()))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .sum();
        assert_eq!(total, 2);
        Ok(())
    }

    #[test]
    fn test_parquet_dates_round_trip() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("data.parquet");
        write_parquet(&path, &sample())?;

        let mut reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?.build()?;
        let batch = reader.next().expect("one batch")?;
        let dates = batch
            .column(2)
            .as_any()
            .downcast_ref::<Date32Array>()
            .expect("date column");
        assert_eq!(
            Date32Type::to_naive_date(dates.value(0)),
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
        );
        Ok(())
    }

    fn year_table(year: &str, header: &[&str], rows: &[&[&str]]) -> YearTable {
        YearTable {
            year: year.into(),
            table: LogicalTable {
                header: header.iter().map(|s| s.to_string()).collect(),
                rows: rows
                    .iter()
                    .map(|r| r.iter().map(|s| s.to_string()).collect())
                    .collect(),
                page_rows: vec![rows.len()],
            },
        }
    }

    #[test]
    fn test_write_monthly_csv_tags_year_and_unions_headers() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("monthly.csv");
        let tables = vec![
            year_table(
                "2024",
                &["S No", "Maker Maker", "Month Wise JAN", "Month Wise FEB"],
                &[
                    &["1", "TATA MOTORS", "1,200", "1,100"],
                    &["No records found."],
                ],
            ),
            year_table(
                "2023",
                &["S No", "Maker Maker", "Month Wise JAN"],
                &[&["1", "HERO MOTOCORP", "900"]],
            ),
        ];
        write_monthly_csv(&path, &tables)?;

        let text = fs::read_to_string(&path)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "S No,Maker Maker,Month Wise JAN,Month Wise FEB,Year",
                "1,TATA MOTORS,\"1,200\",\"1,100\",2024",
                "No records found.,,,,2024",
                "1,HERO MOTOCORP,900,,2023",
            ]
        );
        assert!(!tmp_path(&path).exists());
        Ok(())
    }
}
