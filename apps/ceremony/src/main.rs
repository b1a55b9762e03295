use std::time::Duration;

use clap::{Parser, Subcommand};
use common::{log::init_tracing, log_msg, networks::DEFAULT_INFURA_ID};
use ethers::types::Address;
use eyre::{bail, Context, OptionExt};
use ketubah::{
    select_action, watch_blocks, witness_log::witness_log, Action, Field, KetubahField, TxStatus,
    WriteAction,
};

mod connect;
mod report;

use connect::Ceremony;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "localhost")]
    network: String,

    #[arg(short, long, env = "KETUBAH_PROVIDER")]
    rpc_url: Option<String>,

    #[arg(long, env = "INFURA_ID", default_value = DEFAULT_INFURA_ID)]
    infura_id: String,

    #[arg(short, long, env = "KETUBAH_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    #[arg(short, long, env = "KETUBAH_CONTRACT")]
    contract: String,

    #[arg(long, default_value_t = 4000)]
    poll_interval_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the contract state and what the connected wallet may do
    Status,
    /// Follow the contract block by block
    Watch,
    /// Record consent as one of the partners
    Consent,
    /// Sign the ketubah as a witness
    Witness {
        #[arg(default_value = "Cheers! 🥂")]
        message: String,
    },
    /// List witness messages
    Events {
        #[arg(long, default_value_t = 0)]
        from_block: u64,
    },
    /// Read one contract field at the latest block
    Read {
        #[command(subcommand)]
        field: FieldArg,
    },
}

#[derive(Subcommand, Debug)]
enum FieldArg {
    Partner1,
    Partner2,
    State,
    Consent { address: String },
}

impl FieldArg {
    fn to_field(&self) -> eyre::Result<KetubahField> {
        Ok(match self {
            FieldArg::Partner1 => KetubahField::Partner1,
            FieldArg::Partner2 => KetubahField::Partner2,
            FieldArg::State => KetubahField::ContractState,
            FieldArg::Consent { address } => KetubahField::Consent(
                address
                    .parse::<Address>()
                    .with_context(|| format!("Invalid address: {}", address))?,
            ),
        })
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let ceremony = Ceremony::connect(&cli).await?;

    match cli.command {
        Command::Status => status(&ceremony).await?,
        Command::Watch => watch(&ceremony, Duration::from_millis(cli.poll_interval_ms)).await?,
        Command::Consent => submit(&ceremony, WriteAction::RecordConsent, Action::Consent).await?,
        Command::Witness { message } => {
            submit(&ceremony, WriteAction::Witness { message }, Action::Witness).await?
        }
        Command::Events { from_block } => {
            let entries = witness_log(ceremony.reader.as_ref(), from_block).await?;
            if entries.is_empty() {
                log_msg!("No witnesses yet.");
            }
            for entry in entries {
                report::witness_entry(ceremony.network, &entry);
            }
        }
        Command::Read { field } => {
            let field = field.to_field()?;
            match ceremony.sync.read_field(field).await {
                Field::Ready(value) => report::field(field, value),
                Field::Pending => bail!("Could not read {:?}", field),
            }
        }
    }

    log_msg!("Done.");
    Ok(())
}

async fn status(ceremony: &Ceremony) -> eyre::Result<()> {
    let state = ceremony.snapshot().await?;
    let viewer = ceremony.session.address();
    report::snapshot(ceremony.network, &state, viewer);

    if let Some(address) = viewer {
        let balance = ceremony.balance(address).await?;
        log_msg!("Balance of {:?}: {} ETH", address, balance);
    }
    if ceremony.session.network_mismatch() {
        report::network_warning(ceremony);
    }
    Ok(())
}

async fn watch(ceremony: &Ceremony, period: Duration) -> eyre::Result<()> {
    log_msg!("Watching {} every {:?}...", ceremony.network.name, period);
    let blocks = watch_blocks(ceremony.provider.clone(), period);
    let sync = ceremony.sync.clone();
    let mut updates = sync.subscribe();
    let follower = tokio::spawn(async move { sync.run(blocks).await });

    while updates.changed().await.is_ok() {
        let state = updates.borrow_and_update().clone();
        if let Field::Ready(state) = state {
            let view = ceremony.transactor.optimistic_view(&state);
            report::snapshot(ceremony.network, &view, ceremony.session.address());
        }
    }

    follower.await?;
    Ok(())
}

async fn submit(ceremony: &Ceremony, action: WriteAction, expected: Action) -> eyre::Result<()> {
    let viewer = ceremony
        .session
        .address()
        .ok_or_eyre("A private key is required to send transactions")?;
    if ceremony.session.network_mismatch() {
        report::network_warning(ceremony);
    }

    let state = ceremony.snapshot().await?;
    let offered = select_action(Some(viewer), &ceremony.transactor.optimistic_view(&state));
    if offered != expected {
        bail!(
            "{:?} is not available to {:?} while the contract is {} (offered: {:?})",
            expected,
            viewer,
            state.contract_state,
            offered
        );
    }

    let outcome = ceremony
        .transactor
        .submit_write_with(action, |status| report::tx_status(ceremony.network, status))
        .await?;

    match outcome {
        TxStatus::Confirmed { .. } => {
            let state = ceremony.snapshot().await?;
            report::snapshot(ceremony.network, &state, Some(viewer));
            Ok(())
        }
        TxStatus::Failed { hash, reason } => bail!("Transaction {:?} failed: {}", hash, reason),
        TxStatus::Submitted { hash } => {
            bail!("Lost track of transaction {:?}, check the explorer", hash)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let contract = format!("{:?}", Address::repeat_byte(0xaa));
        let mut argv = vec!["ceremony", "--contract", contract.as_str()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn read_field(cli: Cli) -> eyre::Result<KetubahField> {
        match cli.command {
            Command::Read { field } => field.to_field(),
            other => panic!("expected read, got {:?}", other),
        }
    }

    #[test]
    fn test_read_subcommand() {
        assert_eq!(read_field(parse(&["read", "partner1"])).unwrap(), KetubahField::Partner1);
        assert_eq!(read_field(parse(&["read", "state"])).unwrap(), KetubahField::ContractState);

        let guest = format!("{:?}", Address::repeat_byte(7));
        assert_eq!(
            read_field(parse(&["read", "consent", guest.as_str()])).unwrap(),
            KetubahField::Consent(Address::repeat_byte(7))
        );
        assert!(read_field(parse(&["read", "consent", "not-an-address"])).is_err());
    }
}
