/// One parameterized ranking report. Every ranked table this tool prints
/// goes through here: sort direction, row limit, and value formatting are
/// configuration, not copy-pasted variants.
#[derive(Debug, Clone, Copy)]
pub struct ReportSpec<'a> {
    pub title: &'a str,
    pub label_header: &'a str,
    pub value_label: &'a str,
    pub ascending: bool,
    pub limit: Option<usize>,
    pub decimals: usize,
}

pub fn render_ranking(spec: &ReportSpec<'_>, rows: &[(String, f64)]) -> String {
    let mut sorted: Vec<&(String, f64)> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        let ord = a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal);
        let ord = if spec.ascending { ord } else { ord.reverse() };
        ord.then_with(|| a.0.cmp(&b.0))
    });
    if let Some(limit) = spec.limit {
        sorted.truncate(limit);
    }

    let label_width = sorted
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0)
        .max(spec.label_header.chars().count());

    let mut out = String::new();
    out.push_str(spec.title);
    out.push('\n');
    out.push_str(&format!(
        "{:>3}  {:<label_width$}  {}\n",
        "#", spec.label_header, spec.value_label
    ));
    for (pos, (label, value)) in sorted.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}  {:<label_width$}  {:.prec$}\n",
            pos + 1,
            label,
            value,
            prec = spec.decimals
        ));
    }
    out
}
