//! Two-way reconciliation between blocks and forcing fields.
//!
//! Read path: [`insert_boundary_data`] matches blocks to fields by support
//! point, partitions columns into arguments and components through the
//! forcing-type catalog, and repopulates the typed series. A block that
//! fails resolution is rejected with a warning while its siblings continue;
//! series already rewritten by earlier blocks in the same call stay
//! rewritten. Only time-reference format failures abort the call.
//!
//! Write path: [`create_block_data`] renders one field back into a block.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

use hk_bc::{Block, QuantityColumn};
use hk_core::catalog::{
    forcing_type, DomainQuantity, ForcingTypeEntry, InterpolationKind, UNKNOWN_QUANTITY_NAME,
};
use hk_core::error::{CoreError, CoreResult};
use hk_core::series::{DataSeries, ForcingField, SeriesValue, ValueKind};
use hk_core::time::{
    format_absolute_timestamp, format_offset_value, format_unit_reference, offset_between,
    offset_duration, parse_absolute_timestamp, values_to_datetimes, TimeUnit,
    REFERENCE_DATE_FORMAT,
};

use crate::error::ForcingResult;

/// Outcome of one insertion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsertReport {
    pub inserted: usize,
    pub rejected: usize,
}

impl InsertReport {
    /// False when any block was rejected. Fields touched by earlier blocks
    /// are not rolled back in that case.
    pub fn all_succeeded(&self) -> bool {
        self.rejected == 0
    }
}

/// Insert a sequence of parsed blocks into the field catalog.
///
/// Fields are matched by support-point name; a block naming an unknown
/// support point creates a fresh field.
pub fn insert_boundary_data(
    fields: &mut Vec<ForcingField>,
    blocks: &[Block],
) -> ForcingResult<InsertReport> {
    let mut report = InsertReport::default();
    for block in blocks {
        if insert_block(fields, block)? {
            report.inserted += 1;
        } else {
            report.rejected += 1;
        }
    }
    Ok(report)
}

/// Resolve and apply one block. `Ok(false)` means the block was rejected
/// and warned about; the error path is reserved for time-reference strings
/// that fail every known layout.
fn insert_block(fields: &mut Vec<ForcingField>, block: &Block) -> ForcingResult<bool> {
    let Some(entry) = forcing_type(&block.function_type) else {
        warn!(
            origin = %block.origin(),
            support_point = %block.support_point,
            function_type = %block.function_type,
            "rejecting block with unknown function type"
        );
        return Ok(false);
    };

    let interpolation = match &block.time_interpolation {
        None => None,
        Some(name) => match InterpolationKind::parse(name) {
            Some(kind) => Some(kind),
            None => {
                warn!(
                    origin = %block.origin(),
                    support_point = %block.support_point,
                    interpolation = %name,
                    "rejecting block with unknown interpolation type"
                );
                return Ok(false);
            }
        },
    };

    let (arguments, components) = partition_columns(entry, block);
    let factor = parse_transform(block, "factor", 1.0);
    let offset = parse_transform(block, "offset", 0.0);

    let field = match fields
        .iter_mut()
        .position(|field| field.name == block.support_point)
    {
        Some(index) => &mut fields[index],
        None => {
            fields.push(ForcingField::new(&block.support_point, entry.name));
            fields.last_mut().unwrap()
        }
    };
    field.function_type = entry.name.to_string();

    for (name, column) in arguments {
        let series = find_or_create(&mut field.arguments, name);
        if series.kind == ValueKind::Timestamp || name.eq_ignore_ascii_case("time") {
            let instants = decode_time_values(column, block)?;
            series.kind = ValueKind::Timestamp;
            series.unit = column.unit.clone().unwrap_or_default();
            series.values = instants.into_iter().map(SeriesValue::Timestamp).collect();
            series.interpolation = interpolation;
        } else {
            series.unit = column.unit.clone().unwrap_or_default();
            if let Some(values) = parse_column(column, series.kind, 1.0, 0.0, block) {
                series.values = values;
            }
        }
    }

    for column in components {
        let series = find_or_create(&mut field.components, &column.quantity);
        series.quantity = DomainQuantity::from_kernel_name(&column.quantity);
        series.unit = column.unit.clone().unwrap_or_default();
        if series.kind == ValueKind::Text && column_is_numeric(column) {
            series.kind = ValueKind::Float;
        }
        if let Some(values) = parse_column(column, series.kind, factor, offset, block) {
            series.values = values;
        }
    }

    Ok(true)
}

/// Split a block's columns into (argument name, column) pairs and component
/// columns, per the forcing-type definition. Columns matching neither side
/// are dropped with a warning.
fn partition_columns<'b>(
    entry: &ForcingTypeEntry,
    block: &'b Block,
) -> (Vec<(&'static str, &'b QuantityColumn)>, Vec<&'b QuantityColumn>) {
    let mut arguments = Vec::new();
    let mut claimed = vec![false; block.quantities.len()];

    for name in entry.argument_quantities {
        for (index, column) in block.quantities.iter().enumerate() {
            if !claimed[index] && column.quantity.eq_ignore_ascii_case(name) {
                claimed[index] = true;
                arguments.push((*name, column));
                break;
            }
        }
    }

    let mut components = Vec::new();
    for (index, column) in block.quantities.iter().enumerate() {
        if claimed[index] {
            continue;
        }
        let name = column.quantity.to_ascii_lowercase();
        if entry
            .component_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix))
        {
            components.push(column);
        } else {
            warn!(
                origin = %block.origin(),
                support_point = %block.support_point,
                quantity = %column.quantity,
                "dropping column with unmatched quantity name"
            );
        }
    }

    (arguments, components)
}

/// Read a `factor`/`offset` header field, warning and falling back on
/// unparseable input.
fn parse_transform(block: &Block, key: &str, fallback: f64) -> f64 {
    match block.extra(key) {
        None => fallback,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(
                origin = %block.origin(),
                key,
                value = %raw,
                "unreadable transform value, using default"
            );
            fallback
        }),
    }
}

fn find_or_create<'s>(series: &'s mut Vec<DataSeries>, name: &str) -> &'s mut DataSeries {
    match series
        .iter_mut()
        .position(|existing| existing.name.eq_ignore_ascii_case(name))
    {
        Some(index) => &mut series[index],
        None => {
            series.push(DataSeries::named(name));
            series.last_mut().unwrap()
        }
    }
}

fn column_is_numeric(column: &QuantityColumn) -> bool {
    !column.values.is_empty()
        && column
            .values
            .iter()
            .all(|value| value.trim().parse::<f64>().is_ok())
}

/// Parse a column's raw values into series values of the given kind.
/// `None` means the column was dropped with a warning.
fn parse_column(
    column: &QuantityColumn,
    kind: ValueKind,
    factor: f64,
    offset: f64,
    block: &Block,
) -> Option<Vec<SeriesValue>> {
    match kind {
        ValueKind::Text => Some(
            column
                .values
                .iter()
                .map(|value| SeriesValue::Text(value.clone()))
                .collect(),
        ),
        ValueKind::Float => {
            let mut values = Vec::with_capacity(column.values.len());
            for raw in &column.values {
                match raw.trim().parse::<f64>() {
                    Ok(number) => values.push(SeriesValue::Float(number * factor + offset)),
                    Err(_) => {
                        warn!(
                            origin = %block.origin(),
                            quantity = %column.quantity,
                            value = %raw,
                            "dropping column with unreadable numeric value"
                        );
                        return None;
                    }
                }
            }
            Some(values)
        }
        ValueKind::Timestamp => match decode_time_values(column, block) {
            Ok(instants) => Some(instants.into_iter().map(SeriesValue::Timestamp).collect()),
            Err(error) => {
                warn!(
                    origin = %block.origin(),
                    quantity = %column.quantity,
                    %error,
                    "dropping column with unreadable timestamps"
                );
                None
            }
        },
    }
}

/// Decode a time column's raw values into timestamps.
///
/// Two unit shapes occur on disk: the column's own unit clause is a full
/// `"<unit> since <reference>"` string, or it is a bare unit word and the
/// reference lives in the block's `reference-time` header (date-only
/// `YYYYMMDD`, or a full absolute timestamp) with the unit word repeated in
/// the `time-unit` header. Absent or `"-"` units mean absolute
/// `YYYYMMDDHHMMSS` values. A bare unit word without any block reference is
/// unresolvable and fails through the converter.
fn decode_time_values(column: &QuantityColumn, block: &Block) -> CoreResult<Vec<NaiveDateTime>> {
    let unit = column.unit.as_deref().unwrap_or("").trim();
    let location = block.support_point.as_str();

    let bare_word = !unit.is_empty()
        && unit != "-"
        && !unit
            .split_whitespace()
            .nth(1)
            .is_some_and(|word| word.eq_ignore_ascii_case("since"));
    if !bare_word {
        return values_to_datetimes(&column.values, unit, location);
    }
    let Some(reference) = block.extra("reference-time") else {
        return values_to_datetimes(&column.values, unit, location);
    };
    let reference = parse_reference_time(reference, location)?;

    let time_unit = TimeUnit::parse(unit).or_else(|| {
        block
            .extra("time-unit")
            .and_then(|raw| raw.split_whitespace().next())
            .and_then(TimeUnit::parse)
    });
    let Some(time_unit) = time_unit else {
        debug!(unit, location, "unrecognized time unit word, no samples produced");
        return Ok(Vec::new());
    };

    column
        .values
        .iter()
        .map(|value| {
            let offset: f64 = value
                .trim()
                .parse()
                .map_err(|_| CoreError::BadOffsetValue {
                    value: value.clone(),
                    location: location.to_string(),
                })?;
            Ok(reference + offset_duration(time_unit, offset))
        })
        .collect()
}

fn parse_reference_time(raw: &str, location: &str) -> CoreResult<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), REFERENCE_DATE_FORMAT) {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    parse_absolute_timestamp(raw, location)
}

/// Build one block from a field, for the write path.
///
/// With a reference time, timestamp series become numeric offsets under a
/// `seconds since` unit; without one, they stay absolute `YYYYMMDDHHMMSS`
/// values with no unit clause.
pub fn create_block_data(field: &ForcingField, reference: Option<NaiveDateTime>) -> Block {
    let mut block = Block::new("", 0);
    block.support_point = field.name.clone();
    block.function_type = match forcing_type(&field.function_type) {
        Some(entry) => entry.name.to_string(),
        None => field.function_type.clone(),
    };
    block.set_extra("location-type", field.location_type.canonical_name());

    if field
        .arguments
        .first()
        .is_some_and(|series| series.kind == ValueKind::Timestamp)
    {
        let interpolation = field.arguments[0]
            .interpolation
            .unwrap_or(InterpolationKind::Linear);
        block.time_interpolation = Some(interpolation.as_str().to_string());
    }

    let entry = forcing_type(&block.function_type);
    for (index, series) in field.arguments.iter().enumerate() {
        let name = entry
            .and_then(|entry| entry.argument_quantities.get(index).copied())
            .unwrap_or(series.name.as_str());
        block.quantities.push(render_column(name, series, reference));
    }
    for series in &field.components {
        let name = series
            .quantity
            .map(DomainQuantity::kernel_name)
            .unwrap_or(UNKNOWN_QUANTITY_NAME);
        block.quantities.push(render_column(name, series, reference));
    }
    block
}

fn render_column(name: &str, series: &DataSeries, reference: Option<NaiveDateTime>) -> QuantityColumn {
    let (unit, values) = match series.kind {
        ValueKind::Timestamp => match reference {
            Some(reference) => (
                Some(format_unit_reference(reference, chrono::Duration::zero())),
                series
                    .values
                    .iter()
                    .map(|value| match value {
                        SeriesValue::Timestamp(instant) => format_offset_value(offset_between(
                            reference,
                            *instant,
                            TimeUnit::Seconds,
                        )),
                        other => render_plain(other),
                    })
                    .collect(),
            ),
            None => (
                None,
                series
                    .values
                    .iter()
                    .map(|value| match value {
                        SeriesValue::Timestamp(instant) => format_absolute_timestamp(*instant),
                        other => render_plain(other),
                    })
                    .collect(),
            ),
        },
        _ => (
            (!series.unit.is_empty()).then(|| series.unit.clone()),
            series.values.iter().map(render_plain).collect(),
        ),
    };

    let mut column = QuantityColumn::new(name, unit);
    column.values = values;
    column
}

fn render_plain(value: &SeriesValue) -> String {
    match value {
        SeriesValue::Text(text) => text.clone(),
        SeriesValue::Float(number) => format_offset_value(*number),
        SeriesValue::Timestamp(instant) => format_absolute_timestamp(*instant),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hk_core::catalog::LocationType;

    fn at(y: i32, mo: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn timeseries_block(support_point: &str) -> Block {
        let mut block = Block::new("test.bc", 1);
        block.support_point = support_point.into();
        block.function_type = "timeseries".into();
        block.time_interpolation = Some("linear".into());
        let mut time =
            QuantityColumn::new("time", Some("seconds since 2021-06-01 12:00:00".into()));
        time.values = vec!["0".into(), "3600".into()];
        let mut level = QuantityColumn::new("waterlevelbnd", Some("m".into()));
        level.values = vec!["0.3".into(), "0.45".into()];
        block.quantities.push(time);
        block.quantities.push(level);
        block
    }

    #[test]
    fn inserts_timeseries_into_fresh_field() {
        let mut fields = Vec::new();
        let report = insert_boundary_data(&mut fields, &[timeseries_block("pl1_0001")]).unwrap();
        assert!(report.all_succeeded());
        assert_eq!(report.inserted, 1);

        let field = &fields[0];
        assert_eq!(field.name, "pl1_0001");
        assert_eq!(field.function_type, "timeseries");
        let time = &field.arguments[0];
        assert_eq!(time.kind, ValueKind::Timestamp);
        assert_eq!(time.interpolation, Some(InterpolationKind::Linear));
        assert_eq!(
            time.values,
            vec![
                SeriesValue::Timestamp(at(2021, 6, 1, 12)),
                SeriesValue::Timestamp(at(2021, 6, 1, 13)),
            ]
        );
        let level = &field.components[0];
        assert_eq!(level.quantity, Some(DomainQuantity::WaterLevel));
        assert_eq!(
            level.values,
            vec![SeriesValue::Float(0.3), SeriesValue::Float(0.45)]
        );
    }

    #[test]
    fn unknown_function_type_rejects_without_touching_fields() {
        let mut block = timeseries_block("pl1_0001");
        block.function_type = "wavelet".into();
        let mut fields = Vec::new();
        let report = insert_boundary_data(&mut fields, &[block]).unwrap();
        assert!(!report.all_succeeded());
        assert_eq!(report.rejected, 1);
        assert!(fields.is_empty());
    }

    #[test]
    fn earlier_blocks_stay_applied_when_a_later_block_fails() {
        let good = timeseries_block("good");
        let mut bad = timeseries_block("bad");
        bad.time_interpolation = Some("cubic".into());
        let mut fields = Vec::new();
        let report = insert_boundary_data(&mut fields, &[good, bad]).unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "good");
    }

    #[test]
    fn factor_and_offset_scale_float_components() {
        let mut block = timeseries_block("pl1_0001");
        block.quantities[1].values = vec!["0.5".into(), "0.25".into()];
        block.set_extra("factor", "2");
        block.set_extra("offset", "1");
        let mut fields = Vec::new();
        insert_boundary_data(&mut fields, &[block]).unwrap();
        assert_eq!(
            fields[0].components[0].values,
            vec![SeriesValue::Float(2.0), SeriesValue::Float(1.5)]
        );
    }

    #[test]
    fn harmonic_components_match_by_suffix() {
        let mut block = Block::new("test.bc", 1);
        block.support_point = "pl1_0001".into();
        block.function_type = "harmonic".into();
        let mut component = QuantityColumn::new("harmonic component", None);
        component.values = vec!["M2".into()];
        let mut amplitude = QuantityColumn::new("waterlevelbnd amplitude", Some("m".into()));
        amplitude.values = vec!["1.2".into()];
        let mut stray = QuantityColumn::new("waterlevelbnd frequency", None);
        stray.values = vec!["0.5".into()];
        block.quantities.push(component);
        block.quantities.push(amplitude);
        block.quantities.push(stray);

        let mut fields = Vec::new();
        let report = insert_boundary_data(&mut fields, &[block]).unwrap();
        assert!(report.all_succeeded());

        let field = &fields[0];
        assert_eq!(
            field.arguments[0].values,
            vec![SeriesValue::Text("M2".into())]
        );
        assert_eq!(field.components.len(), 1);
        assert_eq!(field.components[0].name, "waterlevelbnd amplitude");
    }

    fn minutes_table_block() -> Block {
        let mut block = Block::new("test.bcm", 1);
        block.support_point = "pl1_0001".into();
        block.function_type = "timeseries".into();
        block.set_extra("reference-time", "20210601");
        block.set_extra("time-unit", "minutes");
        let mut time = QuantityColumn::new("time", Some("minutes".into()));
        time.values = vec!["720".into(), "780".into()];
        let mut bed = QuantityColumn::new("bed level", Some("m".into()));
        bed.values = vec!["1.5".into(), "1.75".into()];
        block.quantities.push(time);
        block.quantities.push(bed);
        block
    }

    #[test]
    fn bare_unit_word_resolves_against_block_reference() {
        let mut fields = Vec::new();
        let report = insert_boundary_data(&mut fields, &[minutes_table_block()]).unwrap();
        assert!(report.all_succeeded());
        assert_eq!(
            fields[0].arguments[0].values,
            vec![
                SeriesValue::Timestamp(at(2021, 6, 1, 12)),
                SeriesValue::Timestamp(at(2021, 6, 1, 13)),
            ]
        );
    }

    #[test]
    fn reference_header_may_be_a_full_timestamp() {
        let mut block = minutes_table_block();
        block.set_extra("reference-time", "20210601060000");
        let mut fields = Vec::new();
        insert_boundary_data(&mut fields, &[block]).unwrap();
        assert_eq!(
            fields[0].arguments[0].values,
            vec![
                SeriesValue::Timestamp(at(2021, 6, 1, 18)),
                SeriesValue::Timestamp(at(2021, 6, 1, 19)),
            ]
        );
    }

    #[test]
    fn unit_word_may_come_from_the_time_unit_header_alone() {
        let mut block = minutes_table_block();
        block.quantities[0].unit = Some("table".into());
        let mut fields = Vec::new();
        let report = insert_boundary_data(&mut fields, &[block]).unwrap();
        assert!(report.all_succeeded());
        assert_eq!(
            fields[0].arguments[0].values,
            vec![
                SeriesValue::Timestamp(at(2021, 6, 1, 12)),
                SeriesValue::Timestamp(at(2021, 6, 1, 13)),
            ]
        );
    }

    #[test]
    fn bare_unit_without_any_reference_is_fatal() {
        let mut block = minutes_table_block();
        block.extras.clear();
        let mut fields = Vec::new();
        assert!(insert_boundary_data(&mut fields, &[block]).is_err());
    }

    #[test]
    fn bad_reference_time_is_fatal() {
        let mut block = timeseries_block("pl1_0001");
        block.quantities[0].unit = Some("seconds after breakfast".into());
        let mut fields = Vec::new();
        assert!(insert_boundary_data(&mut fields, &[block]).is_err());
    }

    #[test]
    fn reinsertion_replaces_series_values() {
        let mut fields = Vec::new();
        insert_boundary_data(&mut fields, &[timeseries_block("pl1_0001")]).unwrap();
        let mut second = timeseries_block("pl1_0001");
        second.quantities[1].values = vec!["9.9".into(), "9.8".into()];
        insert_boundary_data(&mut fields, &[second]).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(
            fields[0].components[0].values,
            vec![SeriesValue::Float(9.9), SeriesValue::Float(9.8)]
        );
    }

    #[test]
    fn creates_block_with_seconds_offsets() {
        let mut field = ForcingField::new("pl1_0001", "timeseries");
        field.location_type = LocationType::Feature;
        let mut time = DataSeries::named("time");
        time.kind = ValueKind::Timestamp;
        time.interpolation = Some(InterpolationKind::BlockTo);
        time.values = vec![
            SeriesValue::Timestamp(at(2021, 6, 1, 12)),
            SeriesValue::Timestamp(at(2021, 6, 1, 13)),
        ];
        let mut level = DataSeries::named("water level");
        level.kind = ValueKind::Float;
        level.quantity = Some(DomainQuantity::WaterLevel);
        level.unit = "m".into();
        level.values = vec![SeriesValue::Float(0.3), SeriesValue::Float(0.45)];
        field.arguments.push(time);
        field.components.push(level);

        let block = create_block_data(&field, Some(at(2021, 6, 1, 12)));
        assert_eq!(block.support_point, "pl1_0001");
        assert_eq!(block.time_interpolation.as_deref(), Some("block-to"));
        assert_eq!(block.extra("location-type"), Some("feature"));
        assert_eq!(block.quantities[0].quantity, "time");
        assert_eq!(
            block.quantities[0].unit.as_deref(),
            Some("seconds since 2021-06-01 12:00:00")
        );
        assert_eq!(block.quantities[0].values, vec!["0", "3600"]);
        assert_eq!(block.quantities[1].quantity, "waterlevelbnd");
        assert_eq!(block.quantities[1].values, vec!["0.3", "0.45"]);
    }

    #[test]
    fn unknown_component_quantity_writes_placeholder() {
        let mut field = ForcingField::new("pl1_0001", "constant");
        let mut mystery = DataSeries::named("mystery");
        mystery.kind = ValueKind::Float;
        mystery.values = vec![SeriesValue::Float(1.0)];
        field.components.push(mystery);

        let block = create_block_data(&field, None);
        assert_eq!(block.quantities[0].quantity, UNKNOWN_QUANTITY_NAME);
    }

    #[test]
    fn absolute_timestamps_without_reference() {
        let mut field = ForcingField::new("pl1_0001", "timeseries");
        let mut time = DataSeries::named("time");
        time.kind = ValueKind::Timestamp;
        time.values = vec![SeriesValue::Timestamp(at(2021, 6, 1, 12))];
        field.arguments.push(time);
        let mut bed = DataSeries::named("bed");
        bed.kind = ValueKind::Float;
        bed.quantity = Some(DomainQuantity::BedLevel);
        bed.values = vec![SeriesValue::Float(1.5)];
        field.components.push(bed);

        let block = create_block_data(&field, None);
        assert_eq!(block.quantities[0].unit, None);
        assert_eq!(block.quantities[0].values, vec!["20210601120000"]);
    }
}
