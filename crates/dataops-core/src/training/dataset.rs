//! Training data read from the silver layer.

use crate::warehouse::{TableName, Warehouse};
use crate::{DataOpsError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Feature columns, in model weight order.
pub const FEATURES: [&str; 2] = ["dq_is_name_null", "dq_is_underage"];
/// Label column, derived from `dq_status`.
pub const LABEL: &str = "is_risky";

/// Below this many rows the model is evaluated on its own training data.
pub const MIN_SPLIT_ROWS: usize = 10;
pub const TEST_FRACTION: f64 = 0.3;
pub const SPLIT_SEED: u64 = 42;

pub const NOTE_SPLIT: &str = "train_test_split";
pub const NOTE_SAME_DATA: &str = "tiny_dataset_or_single_class -> evaluated on same data";

/// One labelled silver row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub name_null: bool,
    pub underage: bool,
    pub is_risky: bool,
}

impl Sample {
    pub fn features(&self) -> Vec<f64> {
        vec![f64::from(u8::from(self.name_null)), f64::from(u8::from(self.underage))]
    }
}

/// Load every labelled row from `silver`.
///
/// A row is risky when its `dq_status` is anything but `PASS`.
pub fn load_samples(warehouse: &Warehouse, silver: &TableName) -> Result<Vec<Sample>> {
    if !warehouse.table_exists(silver)? {
        return Err(DataOpsError::InputNotFound {
            what: "dataset".to_string(),
            location: silver.to_string(),
        });
    }

    let conn = warehouse.lock_conn()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT dq_is_name_null, dq_is_underage,
                CASE WHEN dq_status <> ?1 THEN 1 ELSE 0 END AS {LABEL}
         FROM {}",
        silver.quoted()
    ))?;

    let rows = stmt.query_map(["PASS"], |row| {
        Ok(Sample {
            name_null: row.get(0)?,
            underage: row.get(1)?,
            is_risky: row.get(2)?,
        })
    })?;

    let mut samples = Vec::new();
    for row in rows {
        samples.push(row?);
    }
    Ok(samples)
}

/// Train and evaluation partitions.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Vec<Sample>,
    pub test: Vec<Sample>,
    pub note: &'static str,
}

/// Partition samples for training.
///
/// Tiny or single-class datasets are used whole for both training and
/// evaluation. Otherwise each class is shuffled with a fixed seed and
/// [`TEST_FRACTION`] of it goes to the test set, keeping class balance.
pub fn split(samples: &[Sample]) -> Split {
    let has_both_classes =
        samples.iter().any(|s| s.is_risky) && samples.iter().any(|s| !s.is_risky);
    if samples.len() < MIN_SPLIT_ROWS || !has_both_classes {
        return Split {
            train: samples.to_vec(),
            test: samples.to_vec(),
            note: NOTE_SAME_DATA,
        };
    }

    let mut rng = StdRng::seed_from_u64(SPLIT_SEED);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for label in [false, true] {
        let mut class: Vec<Sample> = samples.iter().copied().filter(|s| s.is_risky == label).collect();
        class.shuffle(&mut rng);
        let n_test = (class.len() as f64 * TEST_FRACTION).round() as usize;
        let n_test = n_test.min(class.len().saturating_sub(1));
        let rest = class.split_off(n_test);
        test.extend(class);
        train.extend(rest);
    }

    Split {
        train,
        test,
        note: NOTE_SPLIT,
    }
}
