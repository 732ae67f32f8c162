use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// The training runs of one algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgRuns {
    /// Legend label
    pub label: String,
    /// Directory under the models directory holding one run per seed
    pub folder: String,
    /// Frame count after which rows are dropped
    #[serde(default)]
    pub max_frame: Option<f64>,
}

impl AlgRuns {
    pub fn new(label: &str, folder: &str, max_frame: f64) -> Self {
        Self {
            label: label.to_owned(),
            folder: folder.to_owned(),
            max_frame: Some(max_frame),
        }
    }
}

/// What a statistic computes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StatKind {
    /// Median return per environment with its 25-75 percentile band, one line per algorithm
    ReturnComparison { algs: Vec<AlgRuns> },
    /// Median return and sampling probability per environment for one algorithm
    ReturnProba {
        runs: AlgRuns,
        /// Half-open range `[start, end)` of the runs to keep, in path order
        #[serde(default)]
        seeds: Option<[usize; 2]>,
    },
    /// Frames needed by the median return of every environment to reach `--return-to-reach`
    FramesToReach { algs: Vec<AlgRuns> },
}

/// A named statistic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub name: String,
    /// Subplot grid `[rows, cols]`
    #[serde(default = "Stat::default_grid")]
    pub grid: [usize; 2],
    #[serde(flatten)]
    pub kind: StatKind,
}

impl Stat {
    fn default_grid() -> [usize; 2] {
        [1, 1]
    }

    fn comparison(name: &str, grid: [usize; 2], algs: Vec<AlgRuns>) -> Self {
        Self {
            name: name.to_owned(),
            grid,
            kind: StatKind::ReturnComparison { algs },
        }
    }

    fn return_proba(
        name: &str,
        grid: [usize; 2],
        runs: AlgRuns,
        seeds: Option<[usize; 2]>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            grid,
            kind: StatKind::ReturnProba { runs, seeds },
        }
    }
}

/// Configuration of the `compute_stats` binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    pub stats: Vec<Stat>,
}

impl StatsConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Stat> {
        self.stats.iter().find(|stat| stat.name == name)
    }
}

const BUP_FRAMES: f64 = 3_300_000.0;
const BUP_MR_FRAMES: f64 = 1_500_000.0;
const LONG_FRAMES: f64 = 9_900_000.0;

fn gamax_window(curriculum: &str, max_frame: f64) -> AlgRuns {
    let folder = format!("180923/{curriculum}_Window_GreedyAmax_LP_propNone");
    AlgRuns::new("GAmax Window", &folder, max_frame)
}

fn gamax_linreg(curriculum: &str, max_frame: f64) -> AlgRuns {
    let folder = format!("180923/{curriculum}_Linreg_GreedyAmax_LP_propNone");
    AlgRuns::new("GAmax Linreg", &folder, max_frame)
}

fn gprop_linreg(curriculum: &str, max_frame: f64) -> AlgRuns {
    let folder = format!("180923/{curriculum}_Linreg_GreedyProp_LP_propNone");
    AlgRuns::new("GProp Linreg", &folder, max_frame)
}

fn mr(curriculum: &str, prop: &str, max_frame: f64) -> AlgRuns {
    let folder = format!("180926/{curriculum}_Linreg_Prop_MR_prop{prop}");
    AlgRuns::new(&format!("MR {prop}"), &folder, max_frame)
}

impl Default for StatsConfig {
    fn default() -> Self {
        let bup = "BlockedUnlockPickup";
        let kc = "KeyCorridor";
        let om = "ObstructedMaze";
        Self {
            stats: vec![
                Stat::comparison(
                    "BUP-Return-GAmaxWindow-GAmaxLinreg-GPropLinreg",
                    [3, 1],
                    vec![
                        gamax_window(bup, BUP_FRAMES),
                        gamax_linreg(bup, BUP_FRAMES),
                        gprop_linreg(bup, BUP_FRAMES),
                    ],
                ),
                Stat::comparison(
                    "KC-Return-GAmaxWindow-GAmaxLinreg-GPropLinreg",
                    [3, 2],
                    vec![
                        gamax_window(kc, LONG_FRAMES),
                        gamax_linreg(kc, LONG_FRAMES),
                        gprop_linreg(kc, LONG_FRAMES),
                    ],
                ),
                Stat::return_proba(
                    "BUP-ReturnProba-GPropLinreg",
                    [3, 1],
                    gprop_linreg(bup, BUP_FRAMES),
                    Some([6, 7]),
                ),
                Stat::return_proba(
                    "OM-ReturnProba-GPropLinreg",
                    [3, 3],
                    gprop_linreg(om, BUP_FRAMES),
                    None,
                ),
                Stat::comparison(
                    "BUP-Return-MR-coef",
                    [3, 1],
                    vec![
                        gprop_linreg(bup, BUP_MR_FRAMES),
                        mr(bup, "0.8", BUP_MR_FRAMES),
                        mr(bup, "1", BUP_MR_FRAMES),
                    ],
                ),
                Stat::comparison(
                    "BUP-Return-MR-base",
                    [3, 1],
                    vec![
                        gprop_linreg(bup, BUP_MR_FRAMES),
                        mr(bup, "0.8", BUP_MR_FRAMES),
                    ],
                ),
                Stat::comparison(
                    "KC-Return-MR-coef",
                    [3, 2],
                    vec![
                        gprop_linreg(kc, LONG_FRAMES),
                        mr(kc, "0.8", LONG_FRAMES),
                        mr(kc, "1", LONG_FRAMES),
                    ],
                ),
                Stat::comparison(
                    "KC-Return-MR-base",
                    [3, 2],
                    vec![gprop_linreg(kc, LONG_FRAMES), mr(kc, "0.8", LONG_FRAMES)],
                ),
                Stat::comparison(
                    "OM-Return-MR-coef",
                    [3, 3],
                    vec![
                        gprop_linreg(om, LONG_FRAMES),
                        mr(om, "0.8", LONG_FRAMES),
                        mr(om, "1", LONG_FRAMES),
                    ],
                ),
                Stat::comparison(
                    "OM-Return-MR-base",
                    [3, 3],
                    vec![gprop_linreg(om, LONG_FRAMES), mr(om, "0.8", LONG_FRAMES)],
                ),
                Stat::return_proba(
                    "OM-ReturnProba-MR-0.8",
                    [3, 3],
                    mr(om, "0.8", LONG_FRAMES),
                    None,
                ),
                Stat {
                    name: String::from("BUP-FramesToReach-MR"),
                    grid: Stat::default_grid(),
                    kind: StatKind::FramesToReach {
                        algs: vec![
                            gprop_linreg(bup, BUP_MR_FRAMES),
                            mr(bup, "0.8", BUP_MR_FRAMES),
                            mr(bup, "1", BUP_MR_FRAMES),
                        ],
                    },
                },
            ],
        }
    }
}
