//! Column names and parsing choices for a run, optionally read from a RON file.
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to open configuration file at '{}'", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not decode the configuration file at '{}'", path.display())]
    Decode {
        path: PathBuf,
        source: ron::de::SpannedError,
    },
    #[error("Cannot use '{0}' as delimiter")]
    InvalidDelimiter(char),
}

/// Which business rule decides the flow field an estimate is written to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Rule {
    /// The sign of each estimate value chooses between the receivable and the payable field.
    #[default]
    Sign,
    /// The leg column (`1` or `2`) chooses the side, values are written as absolute amounts.
    Leg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Encoding {
    Utf8,
    Latin1,
    Windows1252,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FlowColumns {
    pub code: String,
    pub date: String,
    pub receivable_interest: String,
    pub payable_interest: String,
    pub receivable_pv: String,
    pub payable_pv: String,
}

impl Default for FlowColumns {
    fn default() -> Self {
        FlowColumns {
            code: "cod_emp".into(),
            date: "fecha_cobro".into(),
            receivable_interest: "der_intereses".into(),
            payable_interest: "obl_intereses".into(),
            receivable_pv: "der_vp".into(),
            payable_pv: "obl_vp".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EstimateColumns {
    pub code: String,
    pub date: String,
    pub discount_flow: String,
    pub collateral_flow: String,
    /// Only required with [`Rule::Leg`].
    pub leg: String,
}

impl Default for EstimateColumns {
    fn default() -> Self {
        EstimateColumns {
            code: "M_CONTRACT_".into(),
            date: "M_DATE".into(),
            discount_flow: "M_DISCFLOW".into(),
            collateral_flow: "M_FLOW_COL".into(),
            leg: "M_LEG".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReportColumns {
    pub code: String,
    pub coupon: String,
    pub coupon_alt: String,
}

impl Default for ReportColumns {
    fn default() -> Self {
        ReportColumns {
            code: "codigo_operacion".into(),
            coupon: "cupon".into(),
            coupon_alt: "cupon_1".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub delimiter: char,
    pub rule: Rule,
    /// Tried in order when decoding an input file, the first that decodes wins.
    pub encodings: Vec<Encoding>,
    pub flows: FlowColumns,
    pub estimates: EstimateColumns,
    pub report: ReportColumns,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            delimiter: ';',
            rule: Rule::default(),
            encodings: vec![Encoding::Utf8, Encoding::Latin1, Encoding::Windows1252],
            flows: Default::default(),
            estimates: Default::default(),
            report: Default::default(),
        }
    }
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let file = std::fs::File::open(path).map_err(|source| Error::Open {
            path: path.to_owned(),
            source,
        })?;
        let config: Config = ron::de::from_reader(file).map_err(|source| Error::Decode {
            path: path.to_owned(),
            source,
        })?;
        config.delimiter_byte()?;
        Ok(config)
    }

    /// The delimiter as single byte, as required by the CSV reader.
    pub fn delimiter_byte(&self) -> Result<u8, Error> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(Error::InvalidDelimiter(self.delimiter))
    }
}
