// Chart builders for the territory aggregates.
// Widgets own their labels so callers can hold them past the aggregate borrow.

use crate::resident::Sex;
use crate::territory::{AgeBandCount, AgeSexAggregate, StreetCount, StreetSubset};
use ratatui::{
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType},
};

const BAR_WIDTH: u16 = 7;
const LABEL_WIDTH: usize = 7;

fn titled_block(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(format!(" {} ", title))
}

fn bar(label: String, value: u64, color: Color) -> Bar<'static> {
    Bar::default()
        .label(Line::from(label))
        .value(value)
        .style(Style::default().fg(color))
        .value_style(Style::default().fg(Color::Black).bg(color))
}

fn bar_chart(title: &str, bars: &[Bar<'static>]) -> BarChart<'static> {
    BarChart::default()
        .block(titled_block(title))
        .data(BarGroup::default().bars(bars))
        .bar_width(BAR_WIDTH)
        .bar_gap(1)
}

/// Residents per street, in the order given (most populated first)
pub fn street_count_chart(counts: &[StreetCount]) -> BarChart<'static> {
    let bars: Vec<Bar<'static>> = counts
        .iter()
        .map(|c| bar(abbreviate(&c.street, LABEL_WIDTH), c.count as u64, Color::Cyan))
        .collect();

    bar_chart("Moradores por rua", &bars)
}

/// Residents per age band
pub fn age_band_chart(counts: &[AgeBandCount]) -> BarChart<'static> {
    let bars: Vec<Bar<'static>> = counts
        .iter()
        .map(|c| bar(c.band.short_label().to_string(), c.count as u64, Color::Yellow))
        .collect();

    bar_chart("Faixa etária", &bars)
}

/// Mean age per (street, sex); women in magenta, men in blue
pub fn mean_age_chart(means: &[AgeSexAggregate]) -> BarChart<'static> {
    let bars: Vec<Bar<'static>> = means
        .iter()
        .map(|m| {
            let color = match m.sex {
                Sex::Female => Color::Magenta,
                Sex::Male => Color::Blue,
            };
            let label = format!("{} {}", abbreviate(&m.street, LABEL_WIDTH - 2), m.sex);
            bar(label, m.mean_age.round() as u64, color)
                .text_value(format!("{:.1}", m.mean_age))
        })
        .collect();

    bar_chart("Idade média por rua/sexo", &bars)
}

/// Age of each woman against her house number on one street.
///
/// Owns its points; `chart()` borrows them for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPlot {
    title: String,
    points: Vec<(f64, f64)>,
}

impl ScatterPlot {
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn chart(&self) -> Chart<'_> {
        let (x_max, y_max) = self
            .points
            .iter()
            .fold((1.0_f64, 1.0_f64), |(x, y), (px, py)| (x.max(*px), y.max(*py)));
        let x_max = x_max.ceil();
        let y_max = (y_max / 10.0).ceil() * 10.0;

        let dataset = Dataset::default()
            .name("mulheres")
            .marker(Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Magenta))
            .data(&self.points);

        Chart::new(vec![dataset])
            .block(titled_block(&self.title))
            .x_axis(
                Axis::default()
                    .title("Número")
                    .style(Style::default().fg(Color::Gray))
                    .bounds([0.0, x_max])
                    .labels(axis_labels(x_max)),
            )
            .y_axis(
                Axis::default()
                    .title("Idade")
                    .style(Style::default().fg(Color::Gray))
                    .bounds([0.0, y_max])
                    .labels(axis_labels(y_max)),
            )
    }
}

/// Women of the subset; house numbers without leading digits are skipped
pub fn women_scatter(subset: &StreetSubset<'_>) -> ScatterPlot {
    let points = subset
        .women()
        .filter_map(|r| r.numeric_house_number().map(|n| (f64::from(n), f64::from(r.age))))
        .collect();

    ScatterPlot {
        title: format!("Mulheres - {}", subset.street),
        points,
    }
}

fn axis_labels(max: f64) -> Vec<Span<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    vec![
        Span::styled("0", bold),
        Span::raw(format!("{:.0}", max / 2.0)),
        Span::styled(format!("{:.0}", max), bold),
    ]
}

/// Fit a street name into `width` columns ("RUA MONSENHOR" -> "R.MONS")
fn abbreviate(street: &str, width: usize) -> String {
    if street.chars().count() <= width {
        return street.to_string();
    }

    let mut words = street.split_whitespace();
    let abbreviated = match (words.next(), words.next()) {
        (Some(kind), Some(rest)) => {
            let prefix: String = kind.chars().take(1).collect();
            format!("{}.{}", prefix, rest)
        }
        _ => street.to_string(),
    };

    abbreviated.chars().take(width).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::age_band::AgeBand;
    use crate::resident::{ResidentRecord, ResidentTable};
    use crate::territory::TerritoryManager;
    use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

    fn render(widget: impl Widget) -> String {
        let area = Rect::new(0, 0, 60, 16);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        buf.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_street_count_chart_renders_title() {
        let counts = vec![
            StreetCount { street: "AV MARTE".to_string(), count: 2 },
            StreetCount { street: "RUA X".to_string(), count: 1 },
        ];

        let text = render(street_count_chart(&counts));

        assert!(text.contains("Moradores por rua"));
        assert!(text.contains("RUA X"));
    }

    #[test]
    fn test_age_band_chart_renders_empty_bands() {
        let counts: Vec<AgeBandCount> = AgeBand::ALL
            .iter()
            .map(|band| AgeBandCount { band: *band, count: 0 })
            .collect();

        let text = render(age_band_chart(&counts));

        assert!(text.contains("60+"));
    }

    #[test]
    fn test_women_scatter_points() {
        let table = ResidentTable::from_records(vec![
            ResidentRecord::new("AV MARTE", "545", 30, Sex::Female),
            ResidentRecord::new("AV MARTE", "565", 25, Sex::Female),
            ResidentRecord::new("AV MARTE", "570", 40, Sex::Male),
            ResidentRecord::new("AV MARTE", "S/N", 50, Sex::Female),
        ]);
        let manager = TerritoryManager::new(&table).unwrap();
        let subset = manager.filter_street("AV MARTE");

        let scatter = women_scatter(&subset);

        assert_eq!(scatter.points(), &[(545.0, 30.0), (565.0, 25.0)]);
        assert_eq!(scatter.title(), "Mulheres - AV MARTE");
        assert!(render(scatter.chart()).contains("Mulheres - AV MARTE"));
    }

    #[test]
    fn test_scatter_without_points_still_renders() {
        let table = ResidentTable::from_records(vec![ResidentRecord::new("RUA X", "1", 30, Sex::Male)]);
        let manager = TerritoryManager::new(&table).unwrap();

        let scatter = women_scatter(&manager.filter_street("RUA X"));

        assert!(scatter.points().is_empty());
        let _ = render(scatter.chart());
    }

    #[test]
    fn test_mean_age_chart_renders() {
        let means = vec![AgeSexAggregate {
            street: "AV MARTE".to_string(),
            sex: Sex::Female,
            mean_age: 27.5,
            residents: 2,
        }];

        let text = render(mean_age_chart(&means));

        assert!(text.contains("27.5"));
    }

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate("RUA X", 7), "RUA X");
        assert_eq!(abbreviate("RUA MONSENHOR MESSIAS", 7), "R.MONSE");
        assert_eq!(abbreviate("MONSENHORMESSIAS", 7), "MONSENH");
    }
}
