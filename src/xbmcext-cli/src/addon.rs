//! A small catalog addon used to exercise the router from the command line.

use xbmcext_core::{
    DirectoryItem, DispatchError, Host, ListItem, Params, PatternError, Plugin, SortMethod,
};

pub const STR_TITLES: u32 = 30001;
pub const STR_EVENTS: u32 = 30002;
pub const STR_SEARCH: u32 = 30003;

struct Title {
    id: &'static str,
    name: &'static str,
    year: u16,
}

const TITLES: &[Title] = &[
    Title {
        id: "tt0111161",
        name: "The Shawshank Redemption",
        year: 1994,
    },
    Title {
        id: "tt5180504",
        name: "The Witcher",
        year: 2019,
    },
    Title {
        id: "tt0903747",
        name: "Breaking Bad",
        year: 2008,
    },
];

pub fn register<H: Host>(plugin: &mut Plugin<H>) -> Result<(), PatternError> {
    plugin.route("/")?.to(|ctx, _| {
        let entries = [
            (STR_TITLES, "/titles"),
            (STR_EVENTS, "/event/latest"),
            (STR_SEARCH, "/search"),
        ];
        let items: Vec<_> = entries
            .iter()
            .map(|(label, path)| {
                DirectoryItem::folder(ctx.url_for(path, &Params::new()), ListItem::new(*label))
            })
            .collect();
        ctx.set_directory_items(&items, None, &[])
    });

    plugin.route("/titles")?.optional("year").to(|ctx, params| {
        let year = params.get_i64("year");
        let items: Vec<_> = TITLES
            .iter()
            .filter(|title| year.map_or(true, |year| i64::from(title.year) == year))
            .map(|title| title_item(ctx.url_for(&format!("/title/{}", title.id), &Params::new()), title))
            .collect();
        ctx.set_directory_items(&items, Some("movies"), &[SortMethod::Title, SortMethod::Year])
    });

    plugin
        .route(r#"/title/{id:re("tt\d{7}")}"#)?
        .to(|ctx, params| {
            let id: String = params.require("id")?;
            let title = TITLES
                .iter()
                .find(|title| title.id == id)
                .ok_or_else(|| DispatchError::handler(format!("unknown title {id}")))?;
            let item = ListItem::new(title.name)
                .with_path(format!("https://media.example/stream/{}.m3u8", title.id));
            ctx.set_resolved_url(true, &item)
        });

    // "latest" is not a year; forward to the newest one
    plugin.route("/event/latest")?.to(|ctx, _| {
        let newest = TITLES.iter().map(|title| title.year).max().unwrap_or(2023);
        ctx.redirect(&format!("/event/{newest}"), Params::new())
    });

    plugin.route("/event/{year:int}")?.to(|ctx, params| {
        let year = params.require::<i64>("year")?;
        ctx.redirect("/titles", Params::new().with("year", year))
    });

    plugin.route("/search")?.param("query").optional("page").to(|ctx, params| {
        let query: String = params.require("query")?;
        let page = params.get_i64("page").unwrap_or(1);
        tracing::info!(%query, page, "Searching titles");

        let needle = query.to_lowercase();
        let items: Vec<_> = TITLES
            .iter()
            .filter(|title| title.name.to_lowercase().contains(&needle))
            .map(|title| title_item(ctx.url_for(&format!("/title/{}", title.id), &Params::new()), title))
            .collect();
        ctx.set_directory_items(&items, Some("movies"), &[SortMethod::Label])
    });

    // same path without a query: offer canned searches
    plugin.route("/search")?.to(|ctx, _| {
        let items: Vec<_> = ["bad", "witcher"]
            .iter()
            .map(|query| {
                let url = ctx.url_for("/search", &Params::new().with("query", *query));
                DirectoryItem::folder(url, ListItem::new(*query))
            })
            .collect();
        ctx.set_directory_items(&items, None, &[])
    });

    Ok(())
}

fn title_item(url: String, title: &Title) -> DirectoryItem {
    let mut item = ListItem::new(title.name).with_label2(title.year.to_string());
    item.set_art_all(&format!("https://media.example/art/{}.jpg", title.id));
    DirectoryItem::playable(url, item)
}
