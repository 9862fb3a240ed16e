#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

pub const BLOCKS_CSV: &str = "\
start_ip_int,end_ip_int,country_iso_code,city_name,is_anonymous_proxy,accuracy_radius
16777216,16777471,au,south brisbane,0,1000
16777472,16778239,cn,,0,50
16778240,16779263,au,melbourne,1,20
16779264,16781311,cn,guangzhou,,100
";

pub const CONFIG_YAML: &str = "\
databaseType: Test-City
useValueCache: true
fields:
  - name: country_iso_code
    target: country.iso_code
    capitalization: upper
    critical: true
  - name: city_name
    target: city.names.en
    capitalization: title
    ignoreEmpty: true
  - name: is_anonymous_proxy
    target: traits.is_anonymous_proxy
    type: boolean
    omitZeroValue: true
  - name: accuracy_radius
    target: location.accuracy_radius
    type: uint32
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn str_path(&self, name: &str) -> String {
        self.path().join(name).to_string_lossy().into_owned()
    }
}
