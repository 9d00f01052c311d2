// src/utils/fixed_point.rs
pub const NODATA_VALUE_INT: i16 = -10000;
pub const NODATA_VALUE_FLOAT: f32 = -999.0;

/// Scale index values in [-1, 1] to int16; masked pixels become nodata.
pub fn to_fixed_point(data: &[f32], mask: &[bool], scale_factor: i32) -> Vec<i16> {
    data.iter()
        .zip(mask)
        .map(|(&value, &valid)| {
            if !valid || value.is_nan() {
                NODATA_VALUE_INT
            } else {
                // Clamp to avoid overflow and scale
                let clamped = value.clamp(-0.9999, 0.9999);
                (clamped * scale_factor as f32).round() as i16
            }
        })
        .collect()
}

/// Float output with masked pixels set to the float nodata value.
pub fn to_float_nodata(data: &[f32], mask: &[bool]) -> Vec<f32> {
    data.iter()
        .zip(mask)
        .map(|(&value, &valid)| if valid { value } else { NODATA_VALUE_FLOAT })
        .collect()
}
