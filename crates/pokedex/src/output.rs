use std::io::{self, Write};

use prettytable::format::consts::FORMAT_CLEAN;
use prettytable::{Table, row};

use crate::settings::OutputFormat;
use crate::source::Pokemon;

/// Writes `pokemon` in the given format.
pub fn write_pokemon(
    out: &mut impl Write,
    format: OutputFormat,
    pokemon: &Pokemon,
) -> io::Result<()> {
    match format {
        OutputFormat::Pretty => write_pretty(out, pokemon),
        OutputFormat::Compact => write_compact(out, pokemon),
        OutputFormat::Json => write_json(out, pokemon),
    }
}

fn write_pretty(out: &mut impl Write, pokemon: &Pokemon) -> io::Result<()> {
    writeln!(out, "{} #{:03}", pokemon.name, pokemon.id)?;
    if let Some(image) = &pokemon.image {
        writeln!(out, "  Image:      {image}")?;
    }
    writeln!(out, "  Types:      {}", pokemon.types.join(", "))?;
    writeln!(
        out,
        "  Height:     {:.1} m",
        f64::from(pokemon.height) / 10.0
    )?;
    writeln!(
        out,
        "  Weight:     {:.1} kg",
        f64::from(pokemon.weight) / 10.0
    )?;
    if let Some(experience) = pokemon.base_experience {
        writeln!(out, "  Experience: {experience}")?;
    }

    writeln!(out, "  Abilities:")?;
    for ability in &pokemon.abilities {
        if ability.hidden {
            writeln!(out, "    {} (hidden)", ability.name)?;
        } else {
            writeln!(out, "    {}", ability.name)?;
        }
    }

    writeln!(out, "  Stats:")?;
    for stat in &pokemon.stats {
        writeln!(out, "    {:<16}{:>4}", stat.name, stat.value)?;
    }

    writeln!(out, "  Fetched at {}", pokemon.fetched_at)
}

fn write_compact(out: &mut impl Write, pokemon: &Pokemon) -> io::Result<()> {
    let mut table = Table::new();
    table.set_format(*FORMAT_CLEAN);
    table.set_titles(row![b => "Name", "Id", "Types", "Height", "Weight", "Fetched At"]);
    table.add_row(row![
        pokemon.name,
        pokemon.id,
        pokemon.types.join("/"),
        pokemon.height,
        pokemon.weight,
        pokemon.fetched_at
    ]);
    table.print(out)?;
    Ok(())
}

fn write_json(out: &mut impl Write, pokemon: &Pokemon) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, pokemon)?;
    writeln!(out)
}
