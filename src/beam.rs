use std::{fs::File, path::Path};

#[derive(thiserror::Error, Debug)]
pub enum BeamPowerError {
    #[error("Failed to open the beam power file")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse the beam power CSV file")]
    Csv(#[from] csv::Error),
    #[error("The beam power table is empty")]
    Empty,
    #[error("Failed to parse `{value}` in beam power column `{column}`")]
    Parse { column: String, value: String },
}
type Result<T> = std::result::Result<T, BeamPowerError>;

/// Predicted single pulse energy [uJ] over (bunch charge, photon energy)
#[derive(Debug, Default)]
pub struct BeamPower {
    index_label: String,
    bunch_charges: Vec<String>,
    photon_energies: Vec<String>,
    values: Vec<Vec<f64>>,
}
impl BeamPower {
    pub fn new<S: Into<String>>(
        index_label: S,
        bunch_charges: Vec<String>,
        photon_energies: Vec<String>,
        values: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            index_label: index_label.into(),
            bunch_charges,
            photon_energies,
            values,
        }
    }
    /// Header of the row label column, e.g. "Bunch charge [pC]"
    pub fn index_label(&self) -> &str {
        &self.index_label
    }
    /// Row labels
    pub fn bunch_charges(&self) -> &[String] {
        &self.bunch_charges
    }
    /// Column labels, photon energy bins [keV]
    pub fn photon_energies(&self) -> &[String] {
        &self.photon_energies
    }
    pub fn pulse_energy_uj(&self, row: usize, col: usize) -> f64 {
        self.values[row][col]
    }
    pub fn len(&self) -> usize {
        self.bunch_charges.len()
    }
    pub fn is_empty(&self) -> bool {
        self.bunch_charges.is_empty()
    }
}

pub struct BeamPowerLoader {
    path: String,
}
impl Default for BeamPowerLoader {
    fn default() -> Self {
        Self {
            path: String::from("beam.csv"),
        }
    }
}
impl BeamPowerLoader {
    /// Sets the directory holding the "beam.csv" file
    pub fn data_path<S: AsRef<Path>>(self, data_path: S) -> Self {
        let path = data_path.as_ref().join("beam.csv");
        Self {
            path: path.to_str().unwrap().to_owned(),
        }
    }
    pub fn load(self) -> Result<BeamPower> {
        log::info!("Loading {:?}...", self.path);
        let csv_file = File::open(Path::new(&self.path))?;
        let mut rdr = csv::Reader::from_reader(csv_file);

        let mut headers = rdr.headers()?.iter().map(|h| h.to_string());
        let index_label = headers.next().unwrap_or_default();
        let photon_energies: Vec<_> = headers.collect();

        let mut bunch_charges = vec![];
        let mut values = vec![];
        for result in rdr.records() {
            let record = result?;
            bunch_charges.push(record.iter().next().unwrap().to_string());
            let row = record
                .iter()
                .skip(1)
                .zip(photon_energies.iter())
                .map(|(data, header)| {
                    data.parse::<f64>().map_err(|_| BeamPowerError::Parse {
                        column: header.clone(),
                        value: data.to_string(),
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            values.push(row);
        }
        if bunch_charges.is_empty() {
            return Err(BeamPowerError::Empty);
        }
        Ok(BeamPower::new(
            index_label,
            bunch_charges,
            photon_energies,
            values,
        ))
    }
}
