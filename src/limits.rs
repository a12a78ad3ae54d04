use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::{beam::BeamPower, requirements::StateRequirement};

#[derive(thiserror::Error, Debug)]
pub enum LimitsError {
    #[error("The requirements row has no `{0}` photon energy column")]
    MissingColumn(String),
    #[error("Failed to write the limits CSV file")]
    Csv(#[from] csv::Error),
    #[error("Failed to write the limits file")]
    Io(#[from] std::io::Error),
}
type Result<T> = std::result::Result<T, LimitsError>;

/// Rounds to `digits` decimals, ties to even
fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round_ties_even() / scale
}

/// Derived limit table with the row and column labels of the beam power table
#[derive(Debug, Clone, PartialEq)]
pub struct LimitTable {
    index_label: String,
    index: Vec<String>,
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}
impl LimitTable {
    /// All-zero table shaped after the beam power table
    fn zeros(beam: &BeamPower) -> Self {
        Self {
            index_label: beam.index_label().to_string(),
            index: beam.bunch_charges().to_vec(),
            columns: beam.photon_energies().to_vec(),
            values: vec![vec![0f64; beam.photon_energies().len()]; beam.bunch_charges().len()],
        }
    }
    /// Row labels, bunch charges
    pub fn index(&self) -> &[String] {
        &self.index
    }
    /// Column labels, photon energy bins [keV]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row][col]
    }
    /// Iterator over the rows
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.iter().map(Vec::as_slice)
    }
    /// Iterator over all the cells, row major
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().flatten().cloned()
    }
    /// Writes the table to a CSV file, row labels first
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        let mut header = vec![self.index_label.clone()];
        header.extend(self.columns.iter().cloned());
        wtr.write_record(&header)?;
        for (label, row) in self.index.iter().zip(&self.values) {
            let mut record = vec![label.clone()];
            record.extend(row.iter().map(|v| format!("{}", v)));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// The derived protection limit tables of one device state
#[derive(Debug)]
pub struct Limits {
    state_name: String,
    /// minimum beam attenuation, in [0,1]
    pub min_attenuation: LimitTable,
    /// maximum pulse repetition rate [Hz]
    pub max_rep_rate: LimitTable,
}
impl Limits {
    pub fn state_name(&self) -> &str {
        &self.state_name
    }
    /// Writes both tables to `{state}_min_attenuation.csv` and
    /// `{state}_max_rep_rate.csv`, spaces in the state name replaced with
    /// underscores
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<(PathBuf, PathBuf)> {
        let stem = self.state_name.replace(' ', "_");
        let attenuation_path = dir.as_ref().join(format!("{}_min_attenuation.csv", stem));
        let rep_rate_path = dir.as_ref().join(format!("{}_max_rep_rate.csv", stem));
        log::info!("Saving {:?}...", attenuation_path);
        self.min_attenuation.to_csv(&attenuation_path)?;
        log::info!("Saving {:?}...", rep_rate_path);
        self.max_rep_rate.to_csv(&rep_rate_path)?;
        Ok((attenuation_path, rep_rate_path))
    }
    pub fn summary(&self) {
        println!("SUMMARY: {}", self.state_name);
        Self::print_table("Minimum attenuation", &self.min_attenuation);
        Self::print_table("Maximum repetition rate [Hz]", &self.max_rep_rate);
    }
    fn print_table(title: &str, table: &LimitTable) {
        println!(" - {}:", title);
        println!(
            "    {:>18}  {}",
            table.index_label,
            table
                .columns
                .iter()
                .map(|column| format!("{:>12}", column))
                .join("  ")
        );
        for (label, row) in table.index.iter().zip(&table.values) {
            println!(
                "    {:>18}  {}",
                label,
                row.iter().map(|value| format!("{:>12}", value)).join("  ")
            );
        }
    }
}

/// Protection limits calculator for one device state
///
/// Derives, over the beam power table grid, the minimum attenuation keeping
/// the predicted single pulse energy within the state tolerance and the
/// repetition rate ceiling keeping the integrated power within the state
/// power tolerance
pub struct LimitCalculator<'a> {
    state_name: String,
    requirement: &'a StateRequirement,
    beam: &'a BeamPower,
}
impl<'a> LimitCalculator<'a> {
    pub fn new<S: Into<String>>(
        state_name: S,
        requirement: &'a StateRequirement,
        beam: &'a BeamPower,
    ) -> Self {
        Self {
            state_name: state_name.into(),
            requirement,
            beam,
        }
    }
    pub fn limits(&self) -> Result<Limits> {
        let mut min_attenuation = LimitTable::zeros(self.beam);
        let mut max_rep_rate = LimitTable::zeros(self.beam);
        let max_power_w = self.requirement.power_w;
        for (col, photon_energy) in self.beam.photon_energies().iter().enumerate() {
            let max_pulse_energy_mj = self
                .requirement
                .pulse_energy_mj
                .get(photon_energy)
                .copied()
                .ok_or_else(|| LimitsError::MissingColumn(photon_energy.clone()))?;
            for row in 0..self.beam.len() {
                let pulse_energy_uj = self.beam.pulse_energy_uj(row, col);
                // transmission clamps to 1 before rounding; a zero pulse
                // energy divides to infinity and clamps the same way
                let transmission =
                    round_to((max_pulse_energy_mj / (pulse_energy_uj / 1e3)).min(1f64), 2);
                let attenuation = 1f64 - transmission;
                let rep_rate =
                    round_to(max_power_w / (pulse_energy_uj / 1e6) - attenuation, 0);
                min_attenuation.values[row][col] = attenuation;
                max_rep_rate.values[row][col] = rep_rate;
            }
        }
        Ok(Limits {
            state_name: self.state_name.clone(),
            min_attenuation,
            max_rep_rate,
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn requirement(pulse_energy_mj: &[(&str, f64)], power_w: f64) -> StateRequirement {
        StateRequirement {
            pulse_energy_mj: pulse_energy_mj
                .iter()
                .map(|(column, value)| (column.to_string(), *value))
                .collect::<BTreeMap<String, f64>>(),
            power_w,
        }
    }
    fn beam(photon_energies: &[&str], rows: &[(&str, &[f64])]) -> BeamPower {
        BeamPower::new(
            "Bunch charge [pC]",
            rows.iter().map(|(label, _)| label.to_string()).collect(),
            photon_energies.iter().map(|e| e.to_string()).collect(),
            rows.iter().map(|(_, values)| values.to_vec()).collect(),
        )
    }

    #[test]
    fn full_transmission() {
        let requirement = requirement(&[("8.0", 10f64)], 5f64);
        let beam = beam(&["8.0"], &[("100", &[8000f64])]);
        let limits = LimitCalculator::new("OPEN", &requirement, &beam)
            .limits()
            .unwrap();
        assert_eq!(limits.min_attenuation.get(0, 0), 0f64);
        assert_eq!(limits.max_rep_rate.get(0, 0), 625f64);
    }

    #[test]
    fn attenuated_transmission() {
        let requirement = requirement(&[("8.0", 10f64)], 5f64);
        let beam = beam(&["8.0"], &[("100", &[12000f64])]);
        let limits = LimitCalculator::new("OPEN", &requirement, &beam)
            .limits()
            .unwrap();
        let attenuation = limits.min_attenuation.get(0, 0);
        assert!((attenuation - 0.17).abs() < 1e-12);
        // 5/0.012 - 0.17 = 416.4966... rounds down to 416
        assert_eq!(limits.max_rep_rate.get(0, 0), 416f64);
    }

    #[test]
    fn zero_pulse_energy() {
        let requirement = requirement(&[("8.0", 10f64)], 5f64);
        let beam = beam(&["8.0"], &[("0", &[0f64])]);
        let limits = LimitCalculator::new("OPEN", &requirement, &beam)
            .limits()
            .unwrap();
        assert_eq!(limits.min_attenuation.get(0, 0), 0f64);
        assert!(limits.max_rep_rate.get(0, 0).is_infinite());
    }

    #[test]
    fn tolerance_at_predicted_energy() {
        let requirement = requirement(&[("8.0", 10f64)], 5f64);
        let beam = beam(&["8.0"], &[("100", &[10000f64])]);
        let limits = LimitCalculator::new("OPEN", &requirement, &beam)
            .limits()
            .unwrap();
        assert_eq!(limits.min_attenuation.get(0, 0), 0f64);
    }

    #[test]
    fn attenuation_within_bounds() {
        let requirement = requirement(&[("8.0", 10f64), ("9.0", 0.5)], 5f64);
        let beam = beam(
            &["8.0", "9.0"],
            &[
                ("20", &[500f64, 700f64]),
                ("100", &[8000f64, 9000f64]),
                ("250", &[1e9, 2e9]),
            ],
        );
        let limits = LimitCalculator::new("OPEN", &requirement, &beam)
            .limits()
            .unwrap();
        assert!(limits
            .min_attenuation
            .iter()
            .all(|value| (0f64..=1f64).contains(&value)));
    }

    #[test]
    fn rep_rate_is_integral() {
        let requirement = requirement(&[("8.0", 10f64), ("9.0", 0.5)], 5f64);
        let beam = beam(
            &["8.0", "9.0"],
            &[
                ("20", &[500f64, 700f64]),
                ("100", &[8000f64, 9000f64]),
                ("250", &[12000f64, 13000f64]),
            ],
        );
        let limits = LimitCalculator::new("OPEN", &requirement, &beam)
            .limits()
            .unwrap();
        assert!(limits
            .max_rep_rate
            .iter()
            .filter(|value| value.is_finite())
            .all(|value| value.fract() == 0f64));
    }

    #[test]
    fn shape_matches_beam_table() {
        let requirement = requirement(&[("8.0", 10f64), ("9.0", 0.5)], 5f64);
        let beam = beam(
            &["8.0", "9.0"],
            &[("100", &[8000f64, 9000f64]), ("250", &[12000f64, 13000f64])],
        );
        let limits = LimitCalculator::new("OPEN", &requirement, &beam)
            .limits()
            .unwrap();
        for table in [&limits.min_attenuation, &limits.max_rep_rate] {
            assert_eq!(table.index(), beam.bunch_charges());
            assert_eq!(table.columns(), beam.photon_energies());
        }
    }

    #[test]
    fn missing_photon_energy_column() {
        let requirement = requirement(&[("8.0", 10f64)], 5f64);
        let beam = beam(
            &["8.0", "9.0"],
            &[("100", &[8000f64, 9000f64])],
        );
        let result = LimitCalculator::new("OPEN", &requirement, &beam).limits();
        assert!(matches!(result, Err(LimitsError::MissingColumn(column)) if column == "9.0"));
    }

    #[test]
    fn output_file_naming() {
        let requirement = requirement(&[("8.0", 10f64)], 5f64);
        let beam = beam(&["8.0"], &[("100", &[8000f64])]);
        let limits = LimitCalculator::new("OPEN BEAM", &requirement, &beam)
            .limits()
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let (attenuation_path, rep_rate_path) = limits.save(dir.path()).unwrap();
        assert_eq!(
            attenuation_path,
            dir.path().join("OPEN_BEAM_min_attenuation.csv")
        );
        assert_eq!(rep_rate_path, dir.path().join("OPEN_BEAM_max_rep_rate.csv"));
        assert!(attenuation_path.is_file());
        assert!(rep_rate_path.is_file());
    }

    #[test]
    fn saved_tables_are_reproducible() {
        let requirement = requirement(&[("8.0", 10f64), ("9.0", 0.5)], 5f64);
        let beam = beam(
            &["8.0", "9.0"],
            &[("100", &[8000f64, 9000f64]), ("250", &[12000f64, 13000f64])],
        );
        let calculator = LimitCalculator::new("OPEN", &requirement, &beam);
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let (first_attenuation, first_rep_rate) =
            calculator.limits().unwrap().save(first.path()).unwrap();
        let (second_attenuation, second_rep_rate) =
            calculator.limits().unwrap().save(second.path()).unwrap();
        assert_eq!(
            std::fs::read(first_attenuation).unwrap(),
            std::fs::read(second_attenuation).unwrap()
        );
        assert_eq!(
            std::fs::read(first_rep_rate).unwrap(),
            std::fs::read(second_rep_rate).unwrap()
        );
    }

    #[test]
    fn rounding_ties_to_even() {
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(416.5, 0), 416f64);
        assert_eq!(round_to(417.5, 0), 418f64);
    }
}
