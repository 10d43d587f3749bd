//! Linear spectral unmixing
//!
//! Each pixel spectrum `y` (one value per band) is modelled as `y = A x`
//! where the columns of `A` are endmember signatures. The abundances `x`
//! are the unconstrained least-squares solution `(AᵀA)⁻¹ Aᵀ y`.

use ndarray::{Array3, s};
use rasterfn_core::prelude::*;
use rasterfn_core::raster::neighborhood::collapse_bands;
use serde_json::Value;
use tracing::{debug, warn};

/// Endmember signatures: `rows[band][endmember]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Endmembers {
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Endmembers {
    /// Parse either a matrix with one row per band, or an object mapping
    /// endmember names to their per-band signatures.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::binding("endmembers", format!("invalid JSON: {e}")))?;
        let numbers = |v: &Value| -> Result<Vec<f64>> {
            v.as_array()
                .ok_or_else(|| Error::binding("endmembers", "expected an array of numbers"))?
                .iter()
                .map(|n| {
                    n.as_f64().ok_or_else(|| {
                        Error::binding("endmembers", format!("`{n}` is not a number"))
                    })
                })
                .collect()
        };

        let em = match &value {
            Value::Array(rows) => {
                let rows = rows.iter().map(numbers).collect::<Result<Vec<_>>>()?;
                let k = rows.first().map_or(0, Vec::len);
                Endmembers {
                    names: (1..=k).map(|i| format!("Endmember {i}")).collect(),
                    rows,
                }
            }
            Value::Object(map) => {
                let columns = map.values().map(numbers).collect::<Result<Vec<_>>>()?;
                let bands = columns.first().map_or(0, Vec::len);
                if columns.iter().any(|c| c.len() != bands) {
                    return Err(Error::binding("endmembers", "signatures differ in length"));
                }
                Endmembers {
                    names: map.keys().cloned().collect(),
                    rows: (0..bands).map(|b| columns.iter().map(|c| c[b]).collect()).collect(),
                }
            }
            _ => return Err(Error::binding("endmembers", "expected a matrix or an object")),
        };

        let k = em.names.len();
        if k == 0 || em.rows.is_empty() || em.rows.iter().any(|r| r.len() != k) {
            return Err(Error::binding(
                "endmembers",
                "matrix must be non-empty with equal-length rows",
            ));
        }
        Ok(em)
    }

    pub fn band_count(&self) -> usize {
        self.rows.len()
    }

    pub fn count(&self) -> usize {
        self.names.len()
    }

    /// Least-squares projector `(AᵀA)⁻¹ Aᵀ`, row-major `count x band_count`
    pub fn projector(&self) -> Result<Vec<f64>> {
        let (b, k) = (self.band_count(), self.count());
        let mut normal = vec![0.0; k * k];
        for i in 0..k {
            for j in 0..k {
                normal[i * k + j] = (0..b).map(|r| self.rows[r][i] * self.rows[r][j]).sum();
            }
        }

        let mut proj = vec![0.0; k * b];
        for band in 0..b {
            let rhs: Vec<f64> = (0..k).map(|i| self.rows[band][i]).collect();
            let col = gauss_solve(k, normal.clone(), rhs)?;
            for i in 0..k {
                proj[i * b + band] = col[i];
            }
        }
        Ok(proj)
    }
}

/// Solve `mat * x = rhs` by Gaussian elimination with partial pivoting
fn gauss_solve(n: usize, mut mat: Vec<f64>, mut rhs: Vec<f64>) -> Result<Vec<f64>> {
    for col in 0..n {
        let mut max_val = mat[col * n + col].abs();
        let mut max_row = col;
        for row in (col + 1)..n {
            let val = mat[row * n + col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val < 1e-12 {
            return Err(Error::Kernel("endmember signatures are linearly dependent".into()));
        }

        if max_row != col {
            for j in 0..n {
                mat.swap(col * n + j, max_row * n + j);
            }
            rhs.swap(col, max_row);
        }

        let pivot = mat[col * n + col];
        for row in (col + 1)..n {
            let factor = mat[row * n + col] / pivot;
            mat[row * n + col] = 0.0;
            for j in (col + 1)..n {
                mat[row * n + j] -= factor * mat[col * n + j];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = vec![0.0_f64; n];
    for col in (0..n).rev() {
        let tail: f64 = ((col + 1)..n).map(|j| mat[col * n + j] * x[j]).sum();
        x[col] = (rhs[col] - tail) / mat[col * n + col];
    }
    Ok(x)
}

#[derive(Debug, Clone, Default)]
pub struct LinearSpectralUnmixing {
    endmembers: Endmembers,
    /// `None` when the signatures are singular; every pixel is then invalid
    projector: Option<Vec<f64>>,
}

impl RasterFunction for LinearSpectralUnmixing {
    fn name(&self) -> &'static str {
        "Linear Spectral Unmixing"
    }

    fn description(&self) -> &'static str {
        "Estimates per-pixel endmember abundances from a multispectral raster"
    }

    fn is_licensed(&self, product: &ProductInfo) -> LicenseStatus {
        match product.product_level.as_deref() {
            Some(level) if level.eq_ignore_ascii_case("basic") => {
                LicenseStatus::denied(
                    "Linear spectral unmixing requires the Standard or Advanced level",
                )
            }
            _ => LicenseStatus::ok(),
        }
    }

    fn parameter_info(&self) -> Vec<Parameter> {
        vec![
            Parameter::raster("raster", "Raster"),
            Parameter::string("endmembers", "Endmember Signatures")
                .required()
                .describe("JSON matrix with one row per band and one column per endmember"),
        ]
    }

    fn configuration(&mut self, scalars: &Scalars) -> Result<Configuration> {
        self.endmembers = Endmembers::parse(scalars.text("endmembers")?)?;
        Ok(Configuration::new()
            .inherit(Inherit::DIMENSIONS | Inherit::RESAMPLING)
            .invalidate(Invalidate::STATISTICS | Invalidate::HISTOGRAM | Invalidate::KEY_METADATA)
            .input_mask(true)
            .resampling(true))
    }

    fn update_raster_info(&mut self, args: RefineArgs<'_>) -> Result<RasterInfo> {
        let bands = args.raster("raster")?.info.band_count;
        if self.endmembers.band_count() != bands {
            return Err(Error::Compatibility(format!(
                "endmember matrix has {} rows but the input raster has {bands} bands",
                self.endmembers.band_count()
            )));
        }

        self.projector = match self.endmembers.projector() {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(error = %e, "unmixing system is singular; every pixel will be invalid");
                None
            }
        };

        let mut info = args.output_info;
        info.set_band_count(self.endmembers.count());
        info.pixel_type = PixelType::F32;
        info.no_data = None;
        debug!(bands, endmembers = self.endmembers.count(), "unmixing refined");
        Ok(info)
    }

    fn update_pixels(&self, request: &TileRequest, block: &mut PixelBlock) -> Result<()> {
        let input = block.raster("raster")?;
        let spectra = input.values();
        let (b, rows, cols) = spectra.dim();
        let k = self.endmembers.count();
        let valid = collapse_bands(input.mask_or_valid().view());

        let mut out = Array3::<f64>::zeros((k, rows, cols));
        let mut mask = Array3::<u8>::zeros((k, rows, cols));

        if let Some(proj) = &self.projector {
            for r in 0..rows {
                for c in 0..cols {
                    if valid[[0, r, c]] == 0 {
                        continue;
                    }
                    let y = spectra.slice(s![.., r, c]);
                    for i in 0..k {
                        out[[i, r, c]] = (0..b).map(|band| proj[i * b + band] * y[band]).sum();
                        mask[[i, r, c]] = 1;
                    }
                }
            }
        }

        block.set_output_values(request, &out);
        block.set_output_mask(mask);
        Ok(())
    }

    fn update_key_metadata(
        &self,
        query: &MetadataQuery,
        mut metadata: KeyMetadata,
    ) -> Result<KeyMetadata> {
        if let MetadataScope::Band(n) = query.scope
            && let Some(name) = self.endmembers.names.get(n)
        {
            metadata.insert(names::BAND_NAME, name.as_str());
            metadata.reset(names::WAVELENGTH_MIN);
            metadata.reset(names::WAVELENGTH_MAX);
        }
        Ok(metadata)
    }
}
