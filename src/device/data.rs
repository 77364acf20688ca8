//! Observational data sets.
//!
//! A data set is a list of image-plane samples `(x, y, value, sigma)`. Text
//! files hold one sample per line as comma-separated numbers; lines starting
//! with `#`, `/`, `;` or `!` are comments, and columns after the fourth are
//! ignored. Lines that do not parse are skipped with a warning.

use crate::device::RenderTarget;
use crate::error::{Result, SimFitError};
use log::{debug, warn};
use ndarray::ArrayView2;
use nom::{
    character::complete::{char, space0},
    multi::separated_list1,
    number::complete::double,
    sequence::delimited,
    IResult, Parser,
};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const COMMENT_CHARS: &[char] = &['#', '/', ';', '!'];

/// One observed value at image-plane coordinates `(x, y)` (mas)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub value: f64,
    pub sigma: f64,
}

/// A named list of samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    pub name: String,
    pub samples: Vec<Sample>,
}

impl DataSet {
    /// Create a data set, rejecting empty sample lists and non-positive sigmas.
    pub fn new(name: &str, samples: Vec<Sample>) -> Result<Self> {
        let data = Self {
            name: name.to_string(),
            samples,
        };
        data.validate()?;
        Ok(data)
    }

    /// Check that the data set can be used for a chi computation.
    pub fn validate(&self) -> Result<()> {
        if self.samples.is_empty() {
            return Err(SimFitError::Data(format!(
                "data set '{}' contains no samples",
                self.name
            )));
        }

        if let Some((i, _)) = self
            .samples
            .iter()
            .enumerate()
            .find(|(_, s)| !(s.sigma.is_finite() && s.sigma > 0.0))
        {
            return Err(SimFitError::Data(format!(
                "data set '{}': sample {} has a non-positive uncertainty",
                self.name, i
            )));
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Parse a data set from text.
    ///
    /// # Examples
    ///
    /// ```
    /// use simfit_rs::device::DataSet;
    ///
    /// let text = "# x, y, value, sigma\n0.0, 0.0, 1.0, 0.1\n0.5, 0.5, 0.2, 0.1, extra\n";
    /// let data = DataSet::parse("star", text).unwrap();
    /// assert_eq!(data.len(), 2);
    /// assert_eq!(data.samples[1].value, 0.2);
    /// ```
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let mut samples = Vec::new();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(COMMENT_CHARS) {
                continue;
            }

            match sample_row(line) {
                Ok((_, fields)) if fields.len() >= 4 => {
                    let sample = Sample {
                        x: fields[0],
                        y: fields[1],
                        value: fields[2],
                        sigma: fields[3],
                    };
                    if sample.sigma.is_finite() && sample.sigma > 0.0 {
                        samples.push(sample);
                    } else {
                        warn!(
                            "Skipping line {} of '{}': non-positive uncertainty",
                            number + 1,
                            name
                        );
                    }
                }
                _ => warn!("Could not parse line {} of '{}': {}", number + 1, name, line),
            }
        }

        debug!("Parsed {} samples for data set '{}'", samples.len(), name);
        Self::new(name, samples)
    }

    /// Read a data set from a text file; the file stem names the data set.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            SimFitError::Data(format!("could not read data file {}: {}", path.display(), e))
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(&name, &text)
    }

    /// Format the data set in the text format read by [`parse`](Self::parse).
    pub fn to_text(&self) -> String {
        let mut text = String::from("# x, y, value, sigma\n");
        for s in &self.samples {
            let _ = writeln!(text, "{}, {}, {}, {}", s.x, s.y, s.value, s.sigma);
        }
        text
    }

    /// Build a noisy data set by sampling a rendered image.
    ///
    /// Every `stride`-th pixel in both directions becomes one sample whose
    /// value is the pixel value plus Gaussian noise of width `sigma`.
    pub fn from_image<R: Rng + ?Sized>(
        name: &str,
        image: ArrayView2<'_, f32>,
        target: &RenderTarget,
        sigma: f64,
        stride: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if stride == 0 {
            return Err(SimFitError::Configuration("sampling stride must be positive".to_string()));
        }

        let noise = Normal::new(0.0, sigma)
            .map_err(|e| SimFitError::Configuration(format!("invalid noise level {}: {}", sigma, e)))?;

        let mut samples = Vec::new();
        for row in (0..image.nrows()).step_by(stride) {
            for col in (0..image.ncols()).step_by(stride) {
                let (x, y) = target.pixel_centre(col, row);
                samples.push(Sample {
                    x,
                    y,
                    value: f64::from(image[[row, col]]) + noise.sample(rng),
                    sigma,
                });
            }
        }

        Self::new(name, samples)
    }
}

type ParseError<'a> = nom::error::Error<&'a str>;

/// Comma-separated list of numbers, with optional blanks around each field
fn sample_row(input: &str) -> IResult<&str, Vec<f64>> {
    let field = delimited(
        space0::<&str, ParseError>,
        double::<&str, ParseError>,
        space0::<&str, ParseError>,
    );
    let (rest, fields) = separated_list1(char::<&str, ParseError>(','), field).parse(input)?;

    // Trailing non-numeric columns are allowed after the fourth field
    if !rest.is_empty() && !rest.starts_with(',') {
        return Err(nom::Err::Error(nom::error::Error::new(
            rest,
            nom::error::ErrorKind::Verify,
        )));
    }
    Ok((rest, fields))
}
