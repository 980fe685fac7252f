use ndarray::Array2;

/// Paints a filled disc of `radius` pixels centred at `(x, y)`; parts outside the frame are clipped.
pub fn draw_disc(frame: &mut Array2<u8>, center: (f64, f64), radius: f64, intensity: u8) {
    let (rows, cols) = frame.dim();
    let (cx, cy) = center;
    let radius_sq = radius * radius;

    let row_min = (cy - radius).floor().max(0.0) as usize;
    let col_min = (cx - radius).floor().max(0.0) as usize;
    let row_max = ((cy + radius).ceil().max(-1.0) + 1.0).min(rows as f64) as usize;
    let col_max = ((cx + radius).ceil().max(-1.0) + 1.0).min(cols as f64) as usize;

    for row in row_min..row_max {
        for col in col_min..col_max {
            let dx = col as f64 - cx;
            let dy = row as f64 - cy;
            if dx * dx + dy * dy <= radius_sq {
                frame[[row, col]] = intensity;
            }
        }
    }
}
