use ato::cli::{Cli, Commands};
use clap::Parser;
use miette::Result;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    ato::logging::init(global.verbose);

    match cli.command {
        Commands::Init(args) => ato::cli::commands::init::run(args, &global),
        Commands::Catalog(cmd) => ato::cli::commands::catalog::run(cmd, &global),
        Commands::Scenarios(args) => ato::cli::commands::scenarios::run(args, &global),
        Commands::Solve(args) => ato::cli::commands::solve::run(args, &global),
        Commands::Stability(cmd) => ato::cli::commands::stability::run(cmd, &global),
        Commands::Completions(args) => ato::cli::commands::completions::run(args),
    }
}
