//! Rate conversion from per-second to per-month using the acquisition date
//!
//! The month length comes from the `stdtime` key metadata, or
//! `acquisitiondate` when `stdtime` is absent. Dates may be ISO 8601 text
//! or milliseconds since the Unix epoch.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use ndarray::Zip;
use rasterfn_core::prelude::*;
use tracing::debug;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Default)]
pub struct PerSecondToPerMonth {
    /// Seconds in the month of the input's date
    factor: Option<f64>,
}

/// Calendar date of a key metadata value
pub(crate) fn parse_date(value: &MetaValue) -> Option<NaiveDate> {
    match value {
        MetaValue::Number(ms) => {
            DateTime::from_timestamp_millis(*ms as i64).map(|d| d.date_naive())
        }
        MetaValue::Text(s) => {
            let s = s.trim();
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .map(|d| d.date())
                .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
                .or_else(|_| DateTime::parse_from_rfc3339(s).map(|d| d.date_naive()))
                .ok()
        }
        _ => None,
    }
}

pub(crate) fn days_in_month(date: NaiveDate) -> Option<i64> {
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?;
    let next = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)?
    };
    Some((next - first).num_days())
}

impl RasterFunction for PerSecondToPerMonth {
    fn name(&self) -> &'static str {
        "Per Second to Per Month"
    }

    fn description(&self) -> &'static str {
        "Converts a per-second rate to a per-month total for the month of acquisition"
    }

    fn parameter_info(&self) -> Vec<Parameter> {
        vec![
            Parameter::raster("raster", "Raster")
                .describe("Rate per second; needs an acquisition date"),
        ]
    }

    fn configuration(&mut self, _scalars: &Scalars) -> Result<Configuration> {
        Ok(Configuration::new()
            .inherit(Inherit::DIMENSIONS | Inherit::RESAMPLING)
            .invalidate(Invalidate::STATISTICS | Invalidate::HISTOGRAM)
            .key_metadata(&[names::STD_TIME, names::ACQUISITION_DATE])
            .input_mask(true)
            .resampling(true))
    }

    fn update_raster_info(&mut self, args: RefineArgs<'_>) -> Result<RasterInfo> {
        let metadata = &args.raster("raster")?.metadata.dataset;
        let value = metadata
            .get_set(names::STD_TIME)
            .or_else(|| metadata.get_set(names::ACQUISITION_DATE))
            .ok_or_else(|| Error::Metadata("neither stdtime nor acquisitiondate is set".into()))?;
        let date = parse_date(value)
            .ok_or_else(|| Error::Metadata(format!("cannot read a date from `{value}`")))?;
        let days = days_in_month(date)
            .ok_or_else(|| Error::Metadata(format!("no month length for {date}")))?;

        let factor = days as f64 * SECONDS_PER_DAY;
        self.factor = Some(factor);
        debug!(%date, days, factor, "per-month factor latched");

        let mut info = args.output_info;
        info.pixel_type = PixelType::F32;
        info.no_data = None;
        Ok(info)
    }

    fn update_pixels(&self, request: &TileRequest, block: &mut PixelBlock) -> Result<()> {
        let factor = self
            .factor
            .ok_or_else(|| Error::Protocol("tile requested before refinement".into()))?;
        let input = block.raster("raster")?;
        let mask = input.mask_or_valid();
        let mut out = input.values();
        Zip::from(&mut out).and(&mask).for_each(|v, &m| {
            *v = if m != 0 { *v * factor } else { 0.0 };
        });

        block.set_output_values(request, &out);
        block.set_output_mask(mask);
        Ok(())
    }

    fn update_key_metadata(
        &self,
        query: &MetadataQuery,
        mut metadata: KeyMetadata,
    ) -> Result<KeyMetadata> {
        if query.scope == MetadataScope::Dataset && query.wants(names::DATA_TYPE) {
            metadata.insert(names::DATA_TYPE, "Scientific");
        }
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use ndarray::array;
    use rasterfn_core::{DatasetMetadata, InputInfo};

    fn input(metadata: KeyMetadata) -> Vec<(&'static str, InputInfo)> {
        let raster = InputRaster::new(info(1, PixelType::F32, 1, 2))
            .with_metadata(DatasetMetadata::new(metadata));
        vec![("raster", InputInfo::Raster(raster))]
    }

    #[test]
    fn test_april_scaling() {
        let mut plugin = PerSecondToPerMonth::default();
        let md = KeyMetadata::new().with(names::ACQUISITION_DATE, "2019-04-15T00:00:00");
        let (config, info) = setup(&mut plugin, &[], input(md)).unwrap();
        assert_eq!(config.key_metadata, vec!["stdtime", "acquisitiondate"]);
        assert_eq!(plugin.factor, Some(2_592_000.0));

        let mut block = PixelBlock::new();
        block.insert_raster(
            "raster",
            pixels(PixelType::F32, array![[[5.0, 1.0]]], Some(array![[[1, 0]]])),
        );
        plugin.update_pixels(&request(&info, 1, 2), &mut block).unwrap();
        let (px, mask) = outputs(&block);
        assert_eq!(px[[0, 0, 0]], 12_960_000.0);
        assert_eq!(mask.unwrap(), array![[[1u8, 0]]]);
    }

    #[test]
    fn test_stdtime_wins_and_accepts_epoch_millis() {
        let mut plugin = PerSecondToPerMonth::default();
        // 2020-02-10T00:00:00Z, a leap February
        let md = KeyMetadata::new()
            .with(names::STD_TIME, 1_581_292_800_000.0)
            .with(names::ACQUISITION_DATE, "2019-04-15");
        setup(&mut plugin, &[], input(md)).unwrap();
        assert_eq!(plugin.factor, Some(29.0 * SECONDS_PER_DAY));
    }

    #[test]
    fn test_missing_date_is_metadata_error() {
        let mut plugin = PerSecondToPerMonth::default();
        let err = setup(&mut plugin, &[], input(KeyMetadata::new())).unwrap_err();
        assert!(matches!(err, Error::Metadata(_)));
        let undated = input(KeyMetadata::new().with(names::STD_TIME, "soon"));
        let err = setup(&mut plugin, &[], undated).unwrap_err();
        assert!(matches!(err, Error::Metadata(_)));
    }

    #[test]
    fn test_days_in_month() {
        let d = |y, m| days_in_month(NaiveDate::from_ymd_opt(y, m, 1).unwrap()).unwrap();
        assert_eq!(d(2019, 12), 31);
        assert_eq!(d(2100, 2), 28);
        assert_eq!(d(2000, 2), 29);
    }
}
