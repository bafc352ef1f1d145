#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use orders_etl::config::EtlConfig;
use tempfile::{TempDir, tempdir};

pub const ORDERS_CSV: &str = "\
order_id,user_id,amount,quantity,created_at,status
o1,u1,10.5,1,2024-01-01T10:00:00Z, Paid
o2,u2,20,2,2024-01-02 11:30:00,REFUNDED
o3,u9,abc,,not a date,paid
";

pub const USERS_CSV: &str = "\
user_id,country,signup_date
u1,US,2023-01-01
u2,DE,2023-06-15
";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch project root that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Workspace pre-populated with `data/raw/orders.csv` and `data/raw/users.csv`.
    pub fn with_inputs(orders: &str, users: &str) -> Self {
        let workspace = Self::new();
        workspace.write("data/raw/orders.csv", orders);
        workspace.write("data/raw/users.csv", users);
        workspace
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config(&self) -> EtlConfig {
        EtlConfig::from_root(self.path())
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path().join(name)).expect("read workspace file")
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path().join(name).exists()
    }
}

/// Parses written CSV output into header and rows.
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).expect("open csv output");
    let headers = reader
        .headers()
        .expect("headers")
        .iter()
        .map(String::from)
        .collect();
    let rows = reader
        .records()
        .map(|record| {
            record
                .expect("record")
                .iter()
                .map(String::from)
                .collect::<Vec<_>>()
        })
        .collect();
    (headers, rows)
}

pub fn column_of(headers: &[String], rows: &[Vec<String>], name: &str) -> Vec<String> {
    let idx = headers
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("column {name} missing from {headers:?}"));
    rows.iter().map(|row| row[idx].clone()).collect()
}
