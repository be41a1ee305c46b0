#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Value as Json, json};
use tempfile::{TempDir, tempdir};

pub const SPENDING_HEADER: &str =
    "Title,Date,Amount,Currency,In EUR,Category,Payment Method,City,Country,Comment";

/// Ten spending records: one lacks an Amount, one has an unparseable date, one
/// uses the dotted fallback date format and one carries padded whitespace.
pub const SPENDING_ROWS: &[&str] = &[
    " Coffee ,2023-05-01,12.50,EUR,12.50,Food,Card,Lyon,France,",
    "Bus,2023.05.10.,2,EUR,2,Transport,Cash,Lyon,France,",
    "Hostel,2023-05-02,30,EUR,30,Lodging,Card,Paris,France,",
    "Dinner,2023-05-03,25,EUR,25,Food,Card,Paris,France,",
    "Museum,2023-05-04,15,EUR,15,Culture,Card,Berlin,Germany,",
    "Train,2023-05-05,40,EUR,40,Transport,Card,Berlin,Germany,",
    "Lunch,2023-05-06,,EUR,11,Food,Cash,Berlin,Germany,receipt lost",
    "Bakery,2023-05-07,4,EUR,4,Food,Cash,Vienna,Austria,",
    "Tram,2023-05-08,3,EUR,3,Transport,Card,Vienna,Austria,",
    "Concert,not a date,50,EUR,50,Culture,Card,Vienna,Austria,",
];

pub const PLACES_HEADER: &str = "Order,Arrival_Date,Nights,Country,City,Host_Name,Couchsurfing_FLG,\
G_FLG,Bike_FLG,Gender,Hosts_Personality_Point,Location_Point,Comfort,Comment";

pub const PLACES_ROWS: &[&str] = &[
    "1,2023-05-01,2,France,Lyon,Anna,Y,N,N,F,5,4,Good,",
    "2,2023-05-03,3,France,Paris,Ben,N,N,Y,M,4,5,Ok,",
    "3,2023-05-06,1,Germany,Berlin,Cleo,Y,Y,N,F,3,3,Good,",
];

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
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

    pub fn write_csv(&self, name: &str, header: &str, rows: &[&str]) -> PathBuf {
        let mut contents = String::from(header);
        contents.push('\n');
        for row in rows {
            contents.push_str(row);
            contents.push('\n');
        }
        self.write(name, &contents)
    }

    pub fn write_spending(&self) -> PathBuf {
        self.write_csv("raw/spending.csv", SPENDING_HEADER, SPENDING_ROWS)
    }

    pub fn write_places(&self) -> PathBuf {
        self.write_csv("raw/places.csv", PLACES_HEADER, PLACES_ROWS)
    }

    /// Path of an output file inside the workspace, as a string for config documents.
    pub fn out(&self, name: &str) -> String {
        self.path().join("out").join(name).to_string_lossy().into_owned()
    }

    /// Config over both local fixtures with cleaned and missing outputs under `out/`.
    pub fn local_config(&self, threshold: f64) -> Json {
        let spending = self.write_spending();
        let places = self.write_places();
        json!({
            "sources": {
                "spending": spending.to_string_lossy(),
                "places": places.to_string_lossy(),
            },
            "required_columns": {
                "spending": ["Title", "Date", "Amount", "In EUR"],
                "places": ["Arrival_Date", "Nights", "City"],
            },
            "missing_data_threshold": threshold,
            "cleaned_outputs": {
                "spending": self.out("cleaned_spending.csv"),
                "places": self.out("cleaned_places.csv"),
            },
            "missing_outputs": {
                "spending": self.out("missing_spending.csv"),
                "places": self.out("missing_places.csv"),
            },
        })
    }

    pub fn write_config(&self, config: &Json) -> PathBuf {
        let rendered = serde_json::to_string_pretty(config).expect("render config");
        self.write("config.json", &rendered)
    }
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("read output file")
        .lines()
        .map(str::to_string)
        .collect()
}
