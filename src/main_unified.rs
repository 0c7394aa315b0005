//! WHISPER CODEX - Unified Entry Point
//!
//! Journal flow: Whisper → Answer → Revelation → Seal → Archetype pass

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use tracing_subscriber::EnvFilter;

use whisper_codex::codex::{Chapter, SealedRevelation};
use whisper_codex::initiation::{InitiationManager, Journey, SealOutcome, DEFAULT_CONFIG_PATH};
use whisper_codex::logos::Revelation;
use whisper_codex::whispers::Whisper;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Overrides the configured data directory
    #[arg(long)]
    data_dir: Option<String>,

    /// Overrides the configured seed
    #[arg(long)]
    seed: Option<u64>,

    /// Read commands from stdin until 'quit'
    #[arg(long, short = 'i')]
    interactive: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the seeker profile
    Profile {
        name: String,
        purpose: String,
        offering: String,
    },
    /// Show the current whisper, issuing one if none is active
    Whisper,
    /// Answer the current whisper and seal its revelation
    Answer { response: Vec<String> },
    /// Skip the current whisper (starts the lockout)
    Skip,
    /// Remove an answered whisper from the log
    Burn { whisper_id: String },
    /// Seal a revelation left pending by an interrupted run
    Seal,
    /// Read the codex
    Codex {
        #[arg(long)]
        chapter: Option<u32>,
    },
    /// List archetypes and their state
    Archetypes,
    /// Issue the aligned whisper of an awakened archetype
    Align { archetype_id: String },
    /// Journey summary
    Status,
    /// Ask the oracle
    Consult { query: Vec<String> },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut manager = InitiationManager::from_path(&args.config)?;
    let mut config = manager.config().clone();
    if let Some(dir) = args.data_dir.clone() {
        config.data_dir = dir;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    manager = InitiationManager::new(config)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&manager.config().log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut journey = manager.open_journey()?;

    if args.interactive {
        return interactive(&mut journey);
    }

    match args.command {
        Some(command) => run(&mut journey, command),
        None => {
            print_status(&mut journey)?;
            println!("\nUse --help to see commands or --interactive for a session");
            Ok(())
        }
    }
}

fn run(journey: &mut Journey, command: Command) -> Result<()> {
    match command {
        Command::Profile {
            name,
            purpose,
            offering,
        } => {
            let profile = journey.create_profile(&name, &purpose, &offering)?;
            println!("🕯️ Welcome, {}. Your path of {} begins.", profile.name, profile.purpose);
        }
        Command::Whisper => match journey.next_whisper()? {
            Some(whisper) => print_whisper(&whisper),
            None => print_silence(journey),
        },
        Command::Answer { response } => {
            let outcome = journey.answer(&response.join(" "))?;
            print_revelation(&outcome.sealed.revelation);
            print_outcome(journey, outcome);
        }
        Command::Skip => {
            let whisper = journey.skip()?;
            println!("🌫️ Whisper skipped: {}", whisper.question);
            print_silence(journey);
        }
        Command::Burn { whisper_id } => {
            let whisper = journey.burn(&whisper_id)?;
            println!("🔥 Burned: {}", whisper.question);
        }
        Command::Seal => seal(journey)?,
        Command::Codex { chapter } => print_codex(journey, chapter),
        Command::Archetypes => print_archetypes(journey),
        Command::Align { archetype_id } => {
            if journey.summon_aligned_whisper(&archetype_id)? {
                if let Some(whisper) = journey.next_whisper()? {
                    print_whisper(&whisper);
                }
            } else {
                println!("🌫️ The archetype is silent for now");
            }
        }
        Command::Status => print_status(journey)?,
        Command::Consult { query } => {
            let answer = journey.consult(&query.join(" "))?;
            println!("\n🔮 {}", answer);
        }
    }
    Ok(())
}

fn interactive(journey: &mut Journey) -> Result<()> {
    println!("\n🗣️ Interactive mode - type 'help' for commands, 'quit' to exit");
    println!("========================================");

    loop {
        journey.dismiss_expired_unlocks();

        print!("\n📝 > ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            println!("👋 Until the next whisper");
            break;
        }
        if input.eq_ignore_ascii_case("help") {
            println!("whisper | answer <text> | skip | burn <id> | seal | codex [n] | archetypes | align <id> | status | consult <text>");
            continue;
        }

        let mut words = input.split_whitespace();
        let verb = words.next().unwrap_or_default().to_lowercase();
        let rest: Vec<String> = words.map(str::to_string).collect();

        let command = match verb.as_str() {
            "whisper" => Command::Whisper,
            "answer" => Command::Answer { response: rest },
            "skip" => Command::Skip,
            "burn" => Command::Burn {
                whisper_id: rest.join(" "),
            },
            "seal" => Command::Seal,
            "codex" => Command::Codex {
                chapter: rest.first().and_then(|n| n.parse().ok()),
            },
            "archetypes" => Command::Archetypes,
            "align" => Command::Align {
                archetype_id: rest.join(" "),
            },
            "status" => Command::Status,
            "consult" => Command::Consult { query: rest },
            other => {
                println!("❓ Unknown command: {}", other);
                continue;
            }
        };

        if let Err(e) = run(journey, command) {
            eprintln!("Error: {:#}", e);
        }
    }
    Ok(())
}

fn seal(journey: &mut Journey) -> Result<()> {
    match journey.seal_pending()? {
        Some(outcome) => print_outcome(journey, outcome),
        None => println!("📖 Nothing waits to be sealed"),
    }
    Ok(())
}

fn print_outcome(journey: &mut Journey, outcome: SealOutcome) {
    let SealOutcome { sealed, awakened } = outcome;
    println!(
        "📖 Sealed in chapter {}, page {}",
        sealed.chapter, sealed.page
    );
    for archetype in awakened {
        println!(
            "\n{} {} has awakened\n   {}",
            archetype.symbol, archetype.name, archetype.description
        );
        journey.acknowledge_unlock(&archetype.id);
    }
}

fn print_whisper(whisper: &Whisper) {
    println!(
        "\n{} {} [{}]",
        whisper.category.emoji(),
        whisper.category,
        whisper.id
    );
    println!("   {}", whisper.question);
}

fn print_silence(journey: &Journey) {
    match journey.whispers().format_lockout_remaining() {
        Some(remaining) => println!("🔒 The whispers are silent for {}", remaining),
        None => println!("🌌 No whispers remain"),
    }
}

fn print_revelation(revelation: &Revelation) {
    println!("\n{} {}", revelation.mood.icon(), revelation.text);
    if let Some(sigil) = &revelation.sigil {
        println!("   ✴️ Sigil: {}", sigil);
    }
}

fn print_codex(journey: &Journey, chapter: Option<u32>) {
    let codex = journey.codex();
    if codex.total_revelations() == 0 {
        println!("📖 The codex is empty");
        return;
    }

    let chapters: Vec<&Chapter> = match chapter {
        Some(n) => codex.chapter(n).into_iter().collect(),
        None => codex.chapters().iter().collect(),
    };
    if chapters.is_empty() {
        println!("📖 No such chapter");
        return;
    }

    for chapter in chapters {
        println!("\n📜 Chapter {}: {}", chapter.number, chapter.title);
        for entry in &chapter.revelations {
            print_entry(entry);
        }
    }
}

fn print_entry(entry: &SealedRevelation) {
    println!(
        "  {:>2}. {} {} ({})",
        entry.page,
        entry.revelation.mood.icon(),
        entry.revelation.text,
        entry.formatted_date()
    );
}

fn print_archetypes(journey: &Journey) {
    for archetype in journey.archetypes().archetypes() {
        let state = if archetype.unlocked { "awakened" } else { "dormant" };
        println!(
            "{} {} [{}] - {} (resonance {})",
            archetype.symbol,
            archetype.name,
            archetype.id,
            state,
            archetype.resonance.total()
        );
    }
}

fn print_status(journey: &mut Journey) -> Result<()> {
    let status = journey.status()?;
    println!("🏛️ WHISPER CODEX");
    match &status.seeker {
        Some(name) => println!("👤 Seeker: {}", name),
        None => println!("👤 No profile yet - run `profile <name> <purpose> <offering>`"),
    }
    if let Some(question) = &status.current_whisper {
        println!("🌑 Current whisper: {}", question);
    }
    if let Some(remaining) = &status.lockout_remaining {
        println!("🔒 Locked for {}", remaining);
    }
    println!(
        "📊 Whispers: {} answered, {} skipped, {} remaining",
        status.answered, status.skipped, status.whispers_remaining
    );
    println!(
        "📖 Codex: {} revelations in {} chapters",
        status.revelations, status.chapters
    );
    println!("🜂 Archetypes: {}/{} awakened", status.awakened, status.roster);
    if status.pending_revelation {
        println!("⏳ A revelation waits to be sealed");
    }
    Ok(())
}
