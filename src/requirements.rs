use std::{collections::BTreeMap, fs::File, path::Path};

#[derive(thiserror::Error, Debug)]
pub enum RequirementsError {
    #[error("Failed to open the requirements file")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse the requirements CSV file")]
    Csv(#[from] csv::Error),
    #[error("The requirements table has no `Power` column")]
    MissingPower,
    #[error("The requirements table is empty")]
    Empty,
    #[error("Failed to parse `{value}` in requirements column `{column}`")]
    Parse { column: String, value: String },
}
type Result<T> = std::result::Result<T, RequirementsError>;

/// Tolerances of a single device state
#[derive(Debug, Default, Clone)]
pub struct StateRequirement {
    /// maximum tolerated single pulse energy [mJ] per photon energy bin
    pub pulse_energy_mj: BTreeMap<String, f64>,
    /// maximum tolerated continuous power [W]
    pub power_w: f64,
}

/// Device tolerance table, one row per operational state
#[derive(Debug, Default)]
pub struct Requirements {
    states: Vec<String>,
    rows: BTreeMap<String, StateRequirement>,
}
impl Requirements {
    /// Returns the first row's state label and tolerances
    ///
    /// The first row names the run: its label keys the requirement lookup
    /// and the output files
    pub fn first_state(&self) -> Option<(&str, &StateRequirement)> {
        self.states
            .first()
            .and_then(|state| self.rows.get(state).map(|row| (state.as_str(), row)))
    }
    pub fn state(&self, name: &str) -> Option<&StateRequirement> {
        self.rows.get(name)
    }
    /// Iterator over the state labels in file order
    pub fn states(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(String::as_str)
    }
    pub fn len(&self) -> usize {
        self.states.len()
    }
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

pub struct RequirementsLoader {
    path: String,
}
impl Default for RequirementsLoader {
    fn default() -> Self {
        Self {
            path: String::from("requirements.csv"),
        }
    }
}
impl RequirementsLoader {
    pub fn path<S: Into<String>>(self, path: S) -> Self {
        Self { path: path.into() }
    }
    pub fn load(self) -> Result<Requirements> {
        log::info!("Loading {:?}...", self.path);
        let csv_file = File::open(Path::new(&self.path))?;
        let mut rdr = csv::Reader::from_reader(csv_file);

        let headers: Vec<_> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        if !headers.iter().skip(1).any(|h| h == "Power") {
            return Err(RequirementsError::MissingPower);
        }

        let mut this = Requirements::default();
        for result in rdr.records() {
            let record = result?;
            let state = record.iter().next().unwrap().to_string();
            let mut row = StateRequirement::default();
            for (data, header) in record.iter().skip(1).zip(headers.iter().skip(1)) {
                let value =
                    data.parse::<f64>()
                        .map_err(|_| RequirementsError::Parse {
                            column: header.clone(),
                            value: data.to_string(),
                        })?;
                if header == "Power" {
                    row.power_w = value;
                } else {
                    row.pulse_energy_mj.insert(header.clone(), value);
                }
            }
            this.states.push(state.clone());
            this.rows.insert(state, row);
        }
        if this.states.is_empty() {
            return Err(RequirementsError::Empty);
        }
        Ok(this)
    }
}
