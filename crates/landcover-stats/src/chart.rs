//! Stacked area chart of class shares over years.
//!
//! Layout: title on top, the plot with percentage and year ticks, axis
//! labels, and a legend of class codes to the right of the plot.

use std::collections::BTreeSet;

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};

use crate::error::{Result, StatsError};
use crate::png::encode_png;
use crate::stats::YearStatRow;

/// Embedded font data - DejaVu Sans Mono (a clean, readable monospace font)
const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

/// Default chart size in pixels.
pub const DEFAULT_CHART_SIZE: (usize, usize) = (960, 540);

const TITLE_SIZE: f32 = 18.0;
const LABEL_SIZE: f32 = 13.0;
const TICK_SIZE: f32 = 11.0;

const MARGIN_LEFT: u32 = 56;
const MARGIN_RIGHT: u32 = 12;
const MARGIN_TOP: u32 = 48;
const MARGIN_BOTTOM: u32 = 48;
const TICK_LEN: u32 = 5;
/// Minimum horizontal gap between year labels
const LABEL_GAP: i32 = 6;

const LEGEND_GAP: u32 = 16;
const LEGEND_ROW: u32 = 16;
const LEGEND_COLUMN: u32 = 56;
const LEGEND_MIN_WIDTH: u32 = 136;
const SWATCH: u32 = 11;

const LEGEND_TITLE: &str = "Land Cover Class";
const X_LABEL: &str = "Year";
const Y_LABEL: &str = "Percentage (%)";

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const GRID: Rgba<u8> = Rgba([200, 200, 200, 255]);

/// Distinct color for the `index`-th class, spread by the golden angle.
pub fn class_color(index: usize) -> [u8; 4] {
    let hue = (index as f64 * 137.508) % 360.0;
    let (s, v) = (0.65, 0.85);

    let c = v * s;
    let h = hue / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    let to_byte = |f: f64| ((f + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_byte(r), to_byte(g), to_byte(b), 255]
}

/// Share table: `shares[year][class]` in percent, plus the axis labels.
struct ShareTable {
    years: Vec<u16>,
    codes: Vec<u8>,
    shares: Vec<Vec<f64>>,
}

impl ShareTable {
    fn from_rows(rows: &[YearStatRow]) -> Self {
        let years: Vec<u16> = rows
            .iter()
            .map(|r| r.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let codes: Vec<u8> = rows
            .iter()
            .map(|r| r.code)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut shares = vec![vec![0.0; codes.len()]; years.len()];
        for row in rows {
            let year = years.binary_search(&row.year);
            let code = codes.binary_search(&row.code);
            if let (Ok(y), Ok(c)) = (year, code) {
                shares[y][c] = row.pct;
            }
        }
        Self { years, codes, shares }
    }

    fn first_year(&self) -> f64 {
        self.years.first().copied().map(f64::from).unwrap_or_default()
    }

    fn last_year(&self) -> f64 {
        self.years.last().copied().map(f64::from).unwrap_or_default()
    }

    /// Shares at a (fractional) year, linearly interpolated between the
    /// surrounding observed years and held flat outside them.
    fn shares_at(&self, year: f64) -> Vec<f64> {
        let last = self.years.len() - 1;
        let i1 = self
            .years
            .partition_point(|y| f64::from(*y) < year)
            .min(last);
        let i0 = i1.saturating_sub(1);
        let (y0, y1) = (f64::from(self.years[i0]), f64::from(self.years[i1]));
        let frac = if y1 > y0 {
            ((year - y0) / (y1 - y0)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.shares[i0]
            .iter()
            .zip(&self.shares[i1])
            .map(|(a, b)| a * (1.0 - frac) + b * frac)
            .collect()
    }

    fn title(&self) -> String {
        match (self.years.first(), self.years.last()) {
            (Some(first), Some(last)) if first != last => {
                format!("Land Cover Change ({}-{})", first, last)
            }
            (Some(year), _) => format!("Land Cover ({})", year),
            _ => "Land Cover".to_string(),
        }
    }
}

/// Pixel positions of the plot area and legend.
#[derive(Debug, Clone, Copy)]
struct Layout {
    plot_left: u32,
    plot_right: u32,
    plot_top: u32,
    plot_bottom: u32,
    legend_left: u32,
    legend_rows: u32,
}

impl Layout {
    fn new(width: u32, height: u32, classes: usize) -> Result<Self> {
        let too_small = || StatsError::Render(format!("chart size {}x{} too small", width, height));

        let plot_top = MARGIN_TOP;
        let plot_bottom = height
            .checked_sub(MARGIN_BOTTOM)
            .filter(|bottom| *bottom > plot_top + 1)
            .ok_or_else(too_small)?;

        // One row is taken by the legend title; overflow wraps into columns
        let legend_rows = ((plot_bottom - plot_top) / LEGEND_ROW)
            .saturating_sub(1)
            .max(1);
        let classes = u32::try_from(classes).unwrap_or(u32::MAX);
        let columns = (classes.saturating_add(legend_rows - 1) / legend_rows).max(1);
        let legend_width = columns
            .saturating_mul(LEGEND_COLUMN)
            .max(LEGEND_MIN_WIDTH);

        let plot_left = MARGIN_LEFT;
        let plot_right = width
            .checked_sub(MARGIN_RIGHT + LEGEND_GAP)
            .and_then(|w| w.checked_sub(legend_width))
            .filter(|right| *right > plot_left + 1)
            .ok_or_else(too_small)?;

        Ok(Self {
            plot_left,
            plot_right,
            plot_top,
            plot_bottom,
            legend_left: plot_right + LEGEND_GAP,
            legend_rows,
        })
    }

    fn plot_width(&self) -> u32 {
        self.plot_right - self.plot_left
    }

    fn plot_height(&self) -> u32 {
        self.plot_bottom - self.plot_top
    }

    /// Year shown at plot column `px`.
    fn year_at(&self, table: &ShareTable, px: u32) -> f64 {
        let (first, last) = (table.first_year(), table.last_year());
        let plot_w = self.plot_width();
        if plot_w > 1 {
            first + f64::from(px) / f64::from(plot_w - 1) * (last - first)
        } else {
            first
        }
    }

    /// Image column of `year` on the x axis.
    fn year_x(&self, table: &ShareTable, year: u16) -> u32 {
        let (first, last) = (table.first_year(), table.last_year());
        if last > first {
            let t = (f64::from(year) - first) / (last - first);
            self.plot_left + (t * f64::from(self.plot_width() - 1)).round() as u32
        } else {
            self.plot_left + self.plot_width() / 2
        }
    }

    /// Top-left corner of the `index`-th legend swatch.
    fn swatch_origin(&self, index: usize) -> (u32, u32) {
        let index = u32::try_from(index).unwrap_or(u32::MAX);
        let column = index / self.legend_rows;
        let row = index % self.legend_rows;
        (
            self.legend_left + column * LEGEND_COLUMN,
            self.plot_top + (row + 1) * LEGEND_ROW + 2,
        )
    }
}

fn text_width(font: &Font, size: f32, text: &str) -> i32 {
    text_size(Scale::uniform(size), font, text).0
}

fn draw_label(img: &mut RgbaImage, font: &Font, size: f32, x: i32, y: i32, text: &str) {
    draw_text_mut(img, INK, x, y, Scale::uniform(size), font, text);
}

fn line(img: &mut RgbaImage, from: (u32, u32), to: (u32, u32), color: Rgba<u8>) {
    draw_line_segment_mut(
        img,
        (from.0 as f32, from.1 as f32),
        (to.0 as f32, to.1 as f32),
        color,
    );
}

fn fill_areas(img: &mut RgbaImage, layout: &Layout, table: &ShareTable, colors: &[Rgba<u8>]) {
    let plot_h = f64::from(layout.plot_height());
    for px in 0..layout.plot_width() {
        let shares = table.shares_at(layout.year_at(table, px));

        for py in layout.plot_top..layout.plot_bottom {
            let value = (f64::from(layout.plot_bottom - py) - 0.5) / plot_h * 100.0;
            let mut cumulative = 0.0;
            for (class, share) in shares.iter().enumerate() {
                cumulative += share;
                if value < cumulative {
                    img.put_pixel(layout.plot_left + px, py, colors[class]);
                    break;
                }
            }
        }
    }
}

fn draw_axes(img: &mut RgbaImage, layout: &Layout, table: &ShareTable, font: &Font) {
    let (left, bottom) = (layout.plot_left - 1, layout.plot_bottom);
    line(img, (left, layout.plot_top), (left, bottom), INK);
    line(img, (left, bottom), (layout.plot_right, bottom), INK);

    // Percentage ticks every 25%
    let tick_height = TICK_SIZE as i32;
    for quarter in 0..=4u32 {
        let y = bottom - layout.plot_height() * quarter / 4;
        line(img, (left - TICK_LEN, y), (left, y), INK);
        let label = format!("{}%", quarter * 25);
        let x = (left - TICK_LEN - 3) as i32 - text_width(font, TICK_SIZE, &label);
        draw_label(img, font, TICK_SIZE, x, y as i32 - tick_height / 2, &label);
    }

    // Year ticks at their numeric position; labels skipped where they would overlap
    let mut last_label_end = i32::MIN / 2;
    for &year in &table.years {
        let x = layout.year_x(table, year);
        line(img, (x, bottom), (x, bottom + TICK_LEN), INK);

        let label = year.to_string();
        let width = text_width(font, TICK_SIZE, &label);
        let label_x = x as i32 - width / 2;
        if label_x >= last_label_end + LABEL_GAP {
            draw_label(img, font, TICK_SIZE, label_x, (bottom + TICK_LEN + 3) as i32, &label);
            last_label_end = label_x + width;
        }
    }

    let center = (layout.plot_left + layout.plot_width() / 2) as i32;
    let x_label = center - text_width(font, LABEL_SIZE, X_LABEL) / 2;
    draw_label(img, font, LABEL_SIZE, x_label, (bottom + 26) as i32, X_LABEL);

    let y_label_top = layout.plot_top as i32 - LABEL_SIZE as i32 - 6;
    draw_label(img, font, LABEL_SIZE, 4, y_label_top, Y_LABEL);
}

fn draw_legend(
    img: &mut RgbaImage,
    layout: &Layout,
    table: &ShareTable,
    colors: &[Rgba<u8>],
    font: &Font,
) {
    draw_label(
        img,
        font,
        LABEL_SIZE,
        layout.legend_left as i32,
        layout.plot_top as i32,
        LEGEND_TITLE,
    );
    for (index, code) in table.codes.iter().enumerate() {
        let (x, y) = layout.swatch_origin(index);
        draw_filled_rect_mut(
            img,
            Rect::at(x as i32, y as i32).of_size(SWATCH, SWATCH),
            colors[index],
        );
        draw_label(
            img,
            font,
            TICK_SIZE,
            (x + SWATCH + 5) as i32,
            y as i32 - 1,
            &code.to_string(),
        );
    }
}

/// Draw the chart.
fn rasterize(rows: &[YearStatRow], width: usize, height: usize) -> Result<RgbaImage> {
    if rows.is_empty() {
        return Err(StatsError::Render("no statistics to chart".to_string()));
    }
    let size_err = || StatsError::Render(format!("chart size {}x{} too large", width, height));
    let width = u32::try_from(width).map_err(|_| size_err())?;
    let height = u32::try_from(height).map_err(|_| size_err())?;

    let table = ShareTable::from_rows(rows);
    let layout = Layout::new(width, height, table.codes.len())?;
    let font = Font::try_from_bytes(FONT_DATA)
        .ok_or_else(|| StatsError::Render("embedded font could not be loaded".to_string()))?;
    let colors: Vec<Rgba<u8>> = (0..table.codes.len()).map(|i| Rgba(class_color(i))).collect();

    let mut img = RgbaImage::from_pixel(width, height, BACKGROUND);

    for quarter in 1..=4u32 {
        let y = layout.plot_bottom - layout.plot_height() * quarter / 4;
        line(&mut img, (layout.plot_left, y), (layout.plot_right - 1, y), GRID);
    }
    fill_areas(&mut img, &layout, &table, &colors);
    draw_axes(&mut img, &layout, &table, &font);
    draw_legend(&mut img, &layout, &table, &colors, &font);

    let title = table.title();
    let title_x = (width as i32 - text_width(&font, TITLE_SIZE, &title)) / 2;
    draw_label(&mut img, &font, TITLE_SIZE, title_x.max(0), 8, &title);

    Ok(img)
}

/// Render class shares (`pct`) as stacked areas over years and encode as PNG.
///
/// Classes are stacked in ascending code order from the bottom, each with
/// a generated color named in the legend. Years are placed on x by value,
/// so gaps between observed years keep their width.
pub fn render_stacked_area_chart(
    rows: &[YearStatRow],
    width: usize,
    height: usize,
) -> Result<Vec<u8>> {
    let img = rasterize(rows, width, height)?;
    encode_png(img.as_raw(), width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::png::PNG_SIGNATURE;

    const W: usize = 480;
    const H: usize = 300;

    fn row(year: u16, code: u8, pct: f64) -> YearStatRow {
        YearStatRow {
            year,
            code,
            count: 0,
            area_km2: 0.0,
            pct,
        }
    }

    fn layout_for(rows: &[YearStatRow]) -> (ShareTable, Layout) {
        let table = ShareTable::from_rows(rows);
        let layout = Layout::new(W as u32, H as u32, table.codes.len()).unwrap();
        (table, layout)
    }

    fn has_ink(img: &RgbaImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> bool {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .any(|(x, y)| *img.get_pixel(x, y) != BACKGROUND)
    }

    #[test]
    fn test_bands_stack_in_code_order() {
        let rows = vec![row(2000, 30, 40.0), row(2000, 10, 60.0)];
        let img = rasterize(&rows, W, H).unwrap();
        let (_, layout) = layout_for(&rows);

        let x = layout.plot_left + 50;
        // Just above the x axis: lowest code
        assert_eq!(img.get_pixel(x, layout.plot_bottom - 2).0, class_color(0));
        // Just below the top: highest code
        assert_eq!(img.get_pixel(x, layout.plot_top + 2).0, class_color(1));
    }

    #[test]
    fn test_years_placed_by_value() {
        // 2001 and 2002 sit close together, far from 1995
        let rows = vec![row(1995, 10, 100.0), row(2001, 10, 100.0), row(2002, 20, 100.0)];
        let img = rasterize(&rows, W, H).unwrap();
        let (table, layout) = layout_for(&rows);
        let near_top = layout.plot_top + 2;

        // Three quarters across is still before 2001, so only the first class
        let x = layout.plot_left + layout.plot_width() * 3 / 4;
        assert_eq!(img.get_pixel(x, near_top).0, class_color(0));
        assert_eq!(img.get_pixel(layout.plot_right - 1, near_top).0, class_color(1));

        let expected =
            layout.plot_left + (6.0 / 7.0 * f64::from(layout.plot_width() - 1)).round() as u32;
        assert_eq!(layout.year_x(&table, 2001), expected);
        assert_eq!(layout.year_x(&table, 1995), layout.plot_left);
    }

    #[test]
    fn test_interpolates_between_years() {
        let (table, _) = layout_for(&[row(1990, 10, 100.0), row(2000, 10, 0.0)]);
        let shares = table.shares_at(1992.5);
        assert!((shares[0] - 75.0).abs() < 1e-9);
        // Held flat outside the observed range
        assert_eq!(table.shares_at(1980.0), vec![100.0]);
        assert_eq!(table.shares_at(2010.0), vec![0.0]);
    }

    #[test]
    fn test_legend_names_each_class() {
        let rows = vec![row(1995, 10, 70.0), row(1995, 20, 30.0), row(2001, 190, 100.0)];
        let img = rasterize(&rows, W, H).unwrap();
        let (_, layout) = layout_for(&rows);

        for index in 0..3 {
            let (x, y) = layout.swatch_origin(index);
            let center = img.get_pixel(x + SWATCH / 2, y + SWATCH / 2).0;
            assert_eq!(center, class_color(index));
            // Code label to the right of the swatch
            assert!(has_ink(&img, x + SWATCH + 5..x + LEGEND_COLUMN, y..y + LEGEND_ROW));
        }
    }

    #[test]
    fn test_title_and_labels_drawn() {
        let rows = vec![row(1995, 10, 100.0), row(2001, 10, 100.0)];
        let img = rasterize(&rows, W, H).unwrap();
        let (table, layout) = layout_for(&rows);

        assert_eq!(table.title(), "Land Cover Change (1995-2001)");
        // Title band
        assert!(has_ink(&img, 0..W as u32, 0..MARGIN_TOP / 2));
        // Percentage labels left of the y axis
        let left_of_axis = 0..layout.plot_left - TICK_LEN - 1;
        assert!(has_ink(&img, left_of_axis, layout.plot_top..layout.plot_bottom));
        // Year labels below the x axis
        let below_axis = layout.plot_bottom + TICK_LEN + 1..H as u32;
        assert!(has_ink(&img, layout.plot_left..layout.plot_right, below_axis));
    }

    #[test]
    fn test_legend_wraps_into_columns() {
        let rows: Vec<YearStatRow> = (0..40u8).map(|c| row(2000, c, 2.5)).collect();
        let (table, layout) = layout_for(&rows);
        let last = table.codes.len() - 1;

        let (first_x, _) = layout.swatch_origin(0);
        let (last_x, last_y) = layout.swatch_origin(last);
        assert!(last_x > first_x);
        assert!(last_y + SWATCH <= layout.plot_bottom);
        assert!(last_x + LEGEND_COLUMN <= W as u32);
    }

    #[test]
    fn test_png_output() {
        let rows = vec![row(1995, 10, 70.0), row(1995, 20, 30.0), row(2001, 10, 50.0)];
        let png = render_stacked_area_chart(&rows, 320, 200).unwrap();

        assert_eq!(&png[..8], &PNG_SIGNATURE);
        assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), 320);
        assert_eq!(u32::from_be_bytes([png[20], png[21], png[22], png[23]]), 200);
    }

    #[test]
    fn test_rejects_empty_and_tiny() {
        assert!(render_stacked_area_chart(&[], 320, 200).is_err());
        assert!(render_stacked_area_chart(&[row(2000, 10, 100.0)], 40, 40).is_err());
    }

    #[test]
    fn test_class_colors_distinct() {
        let colors: BTreeSet<[u8; 4]> = (0..12).map(class_color).collect();
        assert_eq!(colors.len(), 12);
    }
}
