use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use resource_cache::{Read, Resource, ResourceCache};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::output;
use crate::settings::{OutputFormat, Settings};
use crate::source::{FetchError, Pokemon, PokemonSource};

type PokemonResource = Resource<Arc<Pokemon>, FetchError>;

/// Shown whenever no pokemon is selected.
const PROMPT: &str = "Submit a pokemon";

/// Looks up pokemon and renders them, keeping recently viewed ones in a [`ResourceCache`].
#[derive(Debug)]
pub struct App {
    cache: ResourceCache<Arc<Pokemon>, FetchError>,
    source: PokemonSource,
    format: OutputFormat,
    busy_delay: Duration,
}

impl App {
    /// Creates the app. This must be called within a tokio runtime.
    pub fn new(settings: &Settings) -> Result<Self> {
        let cache =
            ResourceCache::new(settings.cache).context("Could not create pokemon cache")?;
        Ok(Self {
            cache,
            source: PokemonSource::new(settings.base_url.clone()),
            format: settings.output_format,
            busy_delay: settings.busy_delay,
        })
    }

    /// Returns the resource for the pokemon called `name`, starting the fetch unless it is
    /// cached already.
    pub fn lookup(&self, name: &str) -> PokemonResource {
        self.cache.get_or_spawn(name, |name| self.source.fetch(name))
    }

    /// Looks up and renders a single pokemon.
    pub async fn show(&self, name: &str, out: &mut impl Write) -> io::Result<()> {
        let resource = self.lookup(name);
        render(&resource, name, self.format, self.busy_delay, out).await
    }

    /// Renders every pokemon named in `input`, one name per line.
    ///
    /// An empty line clears the selection.
    pub async fn interactive<R>(&self, input: R, out: &mut impl Write) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        writeln!(out, "{PROMPT}")?;
        out.flush()?;

        while let Some(line) = lines.next_line().await.context("Could not read from stdin")? {
            let name = line.trim();
            if name.is_empty() {
                writeln!(out, "{PROMPT}")?;
                out.flush()?;
                continue;
            }
            self.show(name, &mut *out).await?;
            out.flush()?;
        }

        Ok(())
    }
}

/// Renders a pokemon resource, showing a fallback while it is loading.
///
/// The fallback is only written if the resource is still pending after `busy_delay`, and at
/// most once. Failures are rendered as an error panel and are not returned, only writing to
/// `out` can fail.
pub async fn render(
    resource: &PokemonResource,
    name: &str,
    format: OutputFormat,
    busy_delay: Duration,
    out: &mut impl Write,
) -> io::Result<()> {
    let mut fallback_shown = false;
    loop {
        match resource.read() {
            Read::Ready(pokemon) => return output::write_pokemon(out, format, &pokemon),
            Read::Failed(error) => return writeln!(out, "There was an error: {error}"),
            Read::Pending(suspended) if fallback_shown => suspended.await,
            Read::Pending(suspended) => {
                let busy = busy_delay.is_zero()
                    || tokio::time::timeout(busy_delay, suspended).await.is_err();
                if busy {
                    writeln!(out, "Fetching {name}...")?;
                    out.flush()?;
                    fallback_shown = true;
                }
            }
        }
    }
}
