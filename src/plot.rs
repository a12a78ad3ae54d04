use plotters::prelude::*;

use crate::limits::{LimitTable, Limits};

/// Plots both limit tables, one SVG per table
pub fn plot_limits(limits: &Limits) {
    plot_table(
        &limits.min_attenuation,
        "MIN_ATTENUATION.svg",
        "Minimum attenuation",
    );
    plot_table(
        &limits.max_rep_rate,
        "MAX_REP_RATE.svg",
        "Maximum repetition rate [Hz]",
    );
}

fn plot_table(table: &LimitTable, filename: &str, y_desc: &str) {
    let max_value = |x: &[f64]| -> f64 {
        x.iter()
            .cloned()
            .filter(|v| v.is_finite())
            .fold(f64::NEG_INFINITY, f64::max)
    };
    let min_value = |x: &[f64]| -> f64 {
        x.iter()
            .cloned()
            .filter(|v| v.is_finite())
            .fold(f64::INFINITY, f64::min)
    };

    let photon_energies: Vec<f64> = table
        .columns()
        .iter()
        .map(|column| column.parse().unwrap())
        .collect();
    let values: Vec<f64> = table.iter().collect();

    let plot = SVGBackend::new(filename, (768, 512)).into_drawing_area();
    plot.fill(&WHITE).unwrap();

    let mut chart = ChartBuilder::on(&plot)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .margin(10)
        .build_cartesian_2d(
            photon_energies[0]..*photon_energies.last().unwrap(),
            min_value(&values)..max_value(&values),
        )
        .unwrap();
    chart
        .configure_mesh()
        .x_desc("Photon energy [keV]")
        .y_desc(y_desc)
        .draw()
        .unwrap();

    let mut colors = colorous::TABLEAU10.iter().cycle();

    for (key, row) in table.index().iter().zip(table.rows()) {
        let color = colors.next().unwrap();
        let rgb = RGBColor(color.r, color.g, color.b);
        chart
            .draw_series(LineSeries::new(
                photon_energies
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .filter(|(_, y)| y.is_finite()),
                &rgb,
            ))
            .unwrap()
            .label(key)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &rgb));
    }
    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .position(SeriesLabelPosition::UpperRight)
        .draw()
        .unwrap();
}
