//! Film search.

use tabled::Tabled;

use reelhouse_core::{AppContext, Film, SearchParams};

use crate::cli::{GlobalOpts, OutputFormat, SearchArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct FilmRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Year")]
    year: String,
    #[tabled(rename = "Genres")]
    genres: String,
}

impl From<&Film> for FilmRow {
    fn from(f: &Film) -> Self {
        Self {
            id: f.film_id,
            title: f.title.clone(),
            year: f.release_year.map_or_else(|| "-".into(), |y| y.to_string()),
            genres: f.genres.join(", "),
        }
    }
}

pub async fn search(ctx: &AppContext, args: &SearchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut params = SearchParams::new(args.query.trim());
    if let Some(page) = args.page {
        params = params.page(page);
    }
    if let Some(size) = args.size {
        params = params.size(size);
    }

    let page = util::completed(ctx, ctx.films().search(&params).await)?;

    // Structured formats get the paging metadata too.
    let out = match global.output {
        OutputFormat::Table | OutputFormat::Plain => output::render_list(
            global.output,
            &page.results,
            |f| FilmRow::from(f),
            |f| f.film_id.to_string(),
        ),
        _ => output::render_single(global.output, &page, |_| String::new(), |_| String::new()),
    };
    output::print_output(&out, global.quiet);

    if global.output == OutputFormat::Table && !global.quiet {
        if let (Some(current), Some(total)) = (page.page, page.total_pages) {
            let results = page
                .total_results
                .map_or_else(String::new, |n| format!(", {n} results"));
            eprintln!("page {current} of {total}{results}");
        }
    }
    Ok(())
}
