use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// Resources requested from the batch scheduler for every job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlurmOptions {
    pub account: String,
    pub cpus_per_task: usize,
    pub gres: String,
    pub mem: String,
}

impl Default for SlurmOptions {
    fn default() -> Self {
        Self {
            account: String::from("def-bengioy"),
            cpus_per_task: 4,
            gres: String::from("gpu:1"),
            mem: String::from("4G"),
        }
    }
}

impl SlurmOptions {
    /// `sbatch` prefix of a job running for at most `time`
    pub fn command(&self, time: &str) -> String {
        format!(
            "sbatch --account={} --time={} --cpus-per-task={} --gres={} --mem={}",
            self.account, time, self.cpus_per_task, self.gres, self.mem
        )
    }
}

/// A training run to submit
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub seed: u64,
    pub curriculum: String,
    /// Run directory, relative to the models directory
    pub model_name: String,
    /// Shell command starting the run
    pub command: String,
}

/// Hyperparameter grid of a batch of training runs
///
/// Every combination of the listed values is one [`Job`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentGrid {
    pub seeds: Vec<u64>,
    pub curriculums: Vec<String>,
    pub rt_hists: Vec<String>,
    pub dist_cps: Vec<String>,
    pub lp_cps: Vec<String>,
    pub dist_crs: Vec<String>,
    pub ks: Vec<usize>,
    pub epsilons: Vec<f64>,
    pub pot_coefs: Vec<f64>,
    /// Wall time of a run, per curriculum
    pub times: BTreeMap<String, String>,
    /// Flags appended to the train command, per curriculum
    pub extra_flags: BTreeMap<String, String>,
    pub slurm: SlurmOptions,
    pub train_command: String,
    pub save_interval: usize,
    /// Seconds between two submissions
    pub delay_secs: f64,
}

fn table(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|&(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|&v| v.to_owned()).collect()
}

impl Default for ExperimentGrid {
    fn default() -> Self {
        Self {
            seeds: (1..=10).collect(),
            curriculums: strings(&[
                "SC-Soft",
                "BabyAI-KeyCorridor",
                "BabyAI-BlockedUnlockPickup",
            ]),
            rt_hists: strings(&["Gaussian"]),
            dist_cps: strings(&["LpPot", "LpPotRr"]),
            lp_cps: strings(&["Linreg"]),
            dist_crs: strings(&["GreedyProp"]),
            ks: vec![20],
            epsilons: vec![0.2],
            pot_coefs: vec![0.0, 0.001],
            times: table(&[
                ("SC-Soft", "3:0:0"),
                ("SC-Hard", "4:0:0"),
                ("BabyAI-BlockedUnlockPickup", "1:0:0"),
                ("BabyAI-UnlockPickupDist", "2:0:0"),
                ("BabyAI-FourObjs", "2:0:0"),
                ("BabyAI-FindObj", "2:0:0"),
                ("BabyAI-KeyCorridor", "2:0:0"),
            ]),
            extra_flags: table(&[
                ("SC-Soft", "--no-instr"),
                ("SC-Hard", "--no-instr"),
                ("BabyAI-BlockedUnlockPickup", "--no-instr"),
                ("BabyAI-UnlockPickupDist", ""),
                ("BabyAI-FourObjs", ""),
                ("BabyAI-FindObj", ""),
                ("BabyAI-KeyCorridor", "--no-instr"),
            ]),
            slurm: SlurmOptions::default(),
            train_command: String::from("exps/run.sh python -m scripts.train"),
            save_interval: 10,
            delay_secs: 1.0,
        }
    }
}

impl ExperimentGrid {
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

    fn lookup<'a>(
        map: &'a BTreeMap<String, String>,
        curriculum: &str,
        name: &str,
    ) -> Result<&'a str, GridError> {
        map.get(curriculum)
            .map(String::as_str)
            .ok_or_else(|| GridError::UnknownCurriculum {
                curriculum: curriculum.to_owned(),
                table: name.to_owned(),
            })
    }

    /// Number of combinations in the grid
    pub fn len(&self) -> usize {
        self.seeds.len()
            * self.curriculums.len()
            * self.rt_hists.len()
            * self.dist_cps.len()
            * self.lp_cps.len()
            * self.dist_crs.len()
            * self.ks.len()
            * self.epsilons.len()
            * self.pot_coefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every job of the grid, the seed varying slowest and the potential coefficient fastest
    ///
    /// Jobs are wrapped in an `sbatch` call unless `use_slurm` is false.
    ///
    /// **Errors** if a curriculum has no wall time or no extra flags entry
    pub fn jobs(&self, use_slurm: bool) -> Result<Vec<Job>, GridError> {
        let mut jobs = Vec::with_capacity(self.len());
        for &seed in self.seeds.iter() {
            for curriculum in self.curriculums.iter() {
                let time = Self::lookup(&self.times, curriculum, "times")?;
                let extra = Self::lookup(&self.extra_flags, curriculum, "extra_flags")?;
                for rt_hist in self.rt_hists.iter() {
                    for dist_cp in self.dist_cps.iter() {
                        for lp_cp in self.lp_cps.iter() {
                            for dist_cr in self.dist_crs.iter() {
                                for &k in self.ks.iter() {
                                    for &eps in self.epsilons.iter() {
                                        for &pot in self.pot_coefs.iter() {
                                            let model_name = format!(
                                                "{curriculum}_{rt_hist}_{dist_cp}_{lp_cp}_{dist_cr}_K{k}_eps{eps}_pot{pot}/seed{seed}"
                                            );
                                            let flags = format!(
                                                "--seed {seed} --curriculum {curriculum} --rt-hist {rt_hist} \
                                                 --dist-cp {dist_cp} --lp-cp {lp_cp} --dist-cr {dist_cr} \
                                                 --dist-K {k} --dist-eps {eps} --pot-coef {pot} --model {model_name}"
                                            );
                                            let slurm = use_slurm.then(|| self.slurm.command(time));
                                            let save = format!("--save-interval {}", self.save_interval);
                                            let command = [
                                                slurm.as_deref().unwrap_or_default(),
                                                self.train_command.as_str(),
                                                flags.as_str(),
                                                extra,
                                                save.as_str(),
                                            ]
                                            .iter()
                                            .filter(|part| !part.is_empty())
                                            .copied()
                                            .collect::<Vec<_>>()
                                            .join(" ");
                                            jobs.push(Job {
                                                seed,
                                                curriculum: curriculum.clone(),
                                                model_name,
                                                command,
                                            });
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    fn small_grid() -> ExperimentGrid {
        ExperimentGrid {
            seeds: vec![1, 2],
            curriculums: strings(&["BabyAI-FindObj"]),
            ..Default::default()
        }
    }

    #[test]
    fn default_grid_size() {
        let grid = ExperimentGrid::default();
        assert_eq!(grid.len(), 10 * 3 * 2 * 2, "seeds x curriculums x dist_cps x pot_coefs");
        assert_eq!(grid.jobs(true).unwrap().len(), grid.len());
    }

    #[test]
    fn job_command() {
        let jobs = ExperimentGrid::default().jobs(true).unwrap();
        let job = &jobs[0];
        assert_eq!(
            job.model_name,
            "SC-Soft_Gaussian_LpPot_Linreg_GreedyProp_K20_eps0.2_pot0/seed1"
        );
        assert_eq!(
            job.command,
            "sbatch --account=def-bengioy --time=3:0:0 --cpus-per-task=4 --gres=gpu:1 --mem=4G \
             exps/run.sh python -m scripts.train --seed 1 --curriculum SC-Soft --rt-hist Gaussian \
             --dist-cp LpPot --lp-cp Linreg --dist-cr GreedyProp --dist-K 20 --dist-eps 0.2 \
             --pot-coef 0 --model SC-Soft_Gaussian_LpPot_Linreg_GreedyProp_K20_eps0.2_pot0/seed1 \
             --no-instr --save-interval 10"
        );
    }

    #[test]
    fn job_order() {
        let jobs = small_grid().jobs(false).unwrap();
        let names = jobs.iter().map(|job| job.model_name.as_str()).collect::<Vec<_>>();
        assert_eq!(
            names,
            [
                "BabyAI-FindObj_Gaussian_LpPot_Linreg_GreedyProp_K20_eps0.2_pot0/seed1",
                "BabyAI-FindObj_Gaussian_LpPot_Linreg_GreedyProp_K20_eps0.2_pot0.001/seed1",
                "BabyAI-FindObj_Gaussian_LpPotRr_Linreg_GreedyProp_K20_eps0.2_pot0/seed1",
                "BabyAI-FindObj_Gaussian_LpPotRr_Linreg_GreedyProp_K20_eps0.2_pot0.001/seed1",
                "BabyAI-FindObj_Gaussian_LpPot_Linreg_GreedyProp_K20_eps0.2_pot0/seed2",
                "BabyAI-FindObj_Gaussian_LpPot_Linreg_GreedyProp_K20_eps0.2_pot0.001/seed2",
                "BabyAI-FindObj_Gaussian_LpPotRr_Linreg_GreedyProp_K20_eps0.2_pot0/seed2",
                "BabyAI-FindObj_Gaussian_LpPotRr_Linreg_GreedyProp_K20_eps0.2_pot0.001/seed2",
            ],
            "seed slowest, pot_coef fastest"
        );
        assert!(
            jobs[0].command.starts_with("exps/run.sh"),
            "no sbatch prefix without slurm"
        );
        assert!(
            jobs[0].command.ends_with("seed1 --save-interval 10"),
            "empty extra flags skipped"
        );
    }

    #[test]
    fn unknown_curriculum() {
        let grid = ExperimentGrid {
            curriculums: strings(&["Unknown"]),
            ..Default::default()
        };
        assert_eq!(
            grid.jobs(true),
            Err(GridError::UnknownCurriculum {
                curriculum: String::from("Unknown"),
                table: String::from("times"),
            })
        );
    }

    #[test]
    fn partial_yaml() {
        let grid: ExperimentGrid = serde_yaml::from_str("seeds: [3]\nks: [10, 50]\n").unwrap();
        assert_eq!(grid.seeds, vec![3]);
        assert_eq!(grid.ks, vec![10, 50]);
        assert_eq!(grid.curriculums, ExperimentGrid::default().curriculums, "defaults kept");
    }

    #[test]
    fn shipped_config_matches_default() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/grid.yaml");
        assert_eq!(ExperimentGrid::load(path).unwrap(), ExperimentGrid::default());
    }

    #[test]
    fn save_and_load() {
        let tmp = TempDir::new("grid").unwrap();
        let path = tmp.path().join("grid.yaml");
        let grid = small_grid();
        grid.save(&path).unwrap();
        assert_eq!(ExperimentGrid::load(&path).unwrap(), grid);
    }
}
