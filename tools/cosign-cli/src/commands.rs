use std::{io::Read, path::Path};

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use anyhow::{anyhow, bail, Context, Result};
use cosign_protocol::{
    decode_envelope, decode_multisend, encode_envelope, encode_multisend,
    execution::exec_transaction_calldata,
    interfaces::IMultiSend,
    multisend::{batch_call_only, batch_transactions},
    predict::{deployment_transaction, predict_address, setup_initializer, AccountSetup},
    safe_domain_separator,
    utils::bytes::parse_hex_bytes,
    verify_envelope, LocalKeySigner, PendingTransaction,
};
use cosign_templates::{SafeContext, SpecRegistry, TemplateError, TransactionBatch};
use cosign_types::{
    AddressBook, AddressBookEntry, DraftRecord, DraftStore, MetaTransaction, SafeDomain,
    SafeTransactionParams, StoreError, TransferEnvelope, TypedDataSigner,
};
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{info, warn};

use crate::{
    cli::{
        AddressBookCommand, Cli, Command, DraftCommand, EnvelopeCommand, MultisendCommand,
        TemplateCommand,
    },
    config::NetworkConfig,
    offline::OfflineChainReader,
    store::JsonFileStore,
};

/// Run one command and return what it prints.
pub async fn run(cli: Cli) -> Result<String> {
    let config = NetworkConfig::load(cli.config.as_deref())?;
    let store = JsonFileStore::new(&cli.store);
    let chain_id = cli.chain_id;

    match cli.command {
        Command::Hash {
            nonce,
            call_only,
            envelope,
        } => hash(&config, chain_id, nonce, call_only, &read_text(&envelope)?),
        Command::Multisend { action } => multisend(&config, action),
        Command::Predict {
            owners,
            threshold,
            salt_nonce,
            deployment_code,
        } => predict(&config, owners, threshold, salt_nonce, deployment_code.as_deref()),
        Command::Sign {
            private_key,
            eth_sign,
            envelope,
        } => sign(&private_key, eth_sign, &read_text(&envelope)?).await,
        Command::Aggregate {
            owners,
            threshold,
            envelopes,
        } => {
            let texts = envelopes
                .iter()
                .map(|e| read_text(e))
                .collect::<Result<Vec<_>>>()?;
            aggregate(owners, threshold, &texts)
        }
        Command::Envelope { action } => envelope(action),
        Command::Template {
            templates_dir,
            action,
        } => template(&templates_dir, &store, chain_id, action).await,
        Command::Draft { action } => draft(&store, chain_id, action).await,
        Command::AddressBook { action } => address_book(&store, chain_id, action).await,
    }
}

/// Literal text, `@path` for a file, or `-` for stdin.
pub fn read_text(arg: &str) -> Result<String> {
    if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed reading stdin")?;
        return Ok(buf.trim().to_string());
    }
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .map(|s| s.trim().to_string())
            .with_context(|| format!("failed reading {path}")),
        None => Ok(arg.trim().to_string()),
    }
}

fn pretty(value: &impl serde::Serialize) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed serialising output")
}

fn timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| "unknown".to_string())
}

fn hash(
    config: &NetworkConfig,
    chain_id: u64,
    nonce: U256,
    call_only: bool,
    text: &str,
) -> Result<String> {
    let envelope = decode_envelope(text)?;
    let chain_id = envelope.chain_id.unwrap_or(chain_id);
    let meta = if call_only {
        batch_call_only(&envelope.transactions, config.multisend_call_only)?
    } else {
        batch_transactions(&envelope.transactions, config.multisend)?
    };
    let domain = SafeDomain::new(chain_id, envelope.account);
    let pending = PendingTransaction::new(
        SafeTransactionParams::from_meta(meta, nonce),
        domain,
        Vec::new(),
        0,
    );
    info!(hash = %pending.hash(), account = %envelope.account, %nonce, "proposed transaction");

    let proposal = pending.to_envelope(envelope.transactions);
    pretty(&json!({
        "safeTransactionHash": pending.hash(),
        "domainSeparator": safe_domain_separator(&domain),
        "safeTransaction": pending.params(),
        "envelope": encode_envelope(&proposal)?,
    }))
}

fn multisend(config: &NetworkConfig, action: MultisendCommand) -> Result<String> {
    match action {
        MultisendCommand::Encode {
            wrap,
            call_only,
            transactions,
        } => {
            let subcalls: Vec<MetaTransaction> = serde_json::from_str(&read_text(&transactions)?)
                .context("transactions must be a JSON array of sub-calls")?;
            if !wrap {
                return Ok(encode_multisend(&subcalls).to_string());
            }
            let meta = if call_only {
                batch_call_only(&subcalls, config.multisend_call_only)?
            } else {
                batch_transactions(&subcalls, config.multisend)?
            };
            pretty(&meta)
        }
        MultisendCommand::Decode { data } => {
            let bytes = parse_hex_bytes(&read_text(&data)?)?;
            let packed = if bytes.starts_with(&IMultiSend::multiSendCall::SELECTOR) {
                IMultiSend::multiSendCall::abi_decode(&bytes, true)
                    .map_err(|e| anyhow!("not multiSend calldata: {e}"))?
                    .transactions
            } else {
                bytes
            };
            pretty(&decode_multisend(&packed)?)
        }
    }
}

fn predict(
    config: &NetworkConfig,
    owners: Vec<Address>,
    threshold: u64,
    salt_nonce: U256,
    deployment_code: Option<&str>,
) -> Result<String> {
    if threshold == 0 || threshold > owners.len() as u64 {
        bail!("threshold must be between 1 and the number of owners ({})", owners.len());
    }
    let code: Bytes = match deployment_code {
        Some(raw) => parse_hex_bytes(&read_text(raw)?)?,
        None => config.proxy_creation_code.clone(),
    };
    let setup = AccountSetup::new(owners, threshold, config.fallback_handler);
    let initializer = setup_initializer(&setup);
    let address = predict_address(
        config.proxy_factory,
        config.singleton,
        &initializer,
        salt_nonce,
        &code,
    );
    let deployment =
        deployment_transaction(config.proxy_factory, config.singleton, initializer.clone(), salt_nonce);
    pretty(&json!({
        "address": address.to_checksum(None),
        "initializer": initializer,
        "deployment": deployment,
    }))
}

async fn sign(private_key: &str, eth_sign: bool, text: &str) -> Result<String> {
    let envelope = decode_envelope(text)?;
    let hash = verify_envelope(&envelope)?
        .ok_or_else(|| anyhow!("envelope carries no proposed transaction; run `cosign hash` first"))?;
    let (Some(params), Some(chain_id)) = (&envelope.safe_transaction, envelope.chain_id) else {
        bail!("envelope carries no proposed transaction");
    };

    let signer = LocalKeySigner::from_hex(private_key)?;
    let signature = if eth_sign {
        signer.sign_eth_message(hash)?
    } else {
        signer
            .sign_typed_data(&SafeDomain::new(chain_id, envelope.account), params)
            .await?
    };
    info!(signer = %signer.address(), %hash, "signed");

    let mut signed = envelope;
    signed.signature = Some(signature);
    verify_envelope(&signed)?;
    Ok(encode_envelope(&signed)?)
}

fn aggregate(owners: Vec<Address>, threshold: usize, texts: &[String]) -> Result<String> {
    let envelopes = texts
        .iter()
        .map(|t| decode_envelope(t).map_err(Into::into))
        .collect::<Result<Vec<TransferEnvelope>>>()?;
    let first = envelopes.first().context("no envelopes given")?;
    let params = first
        .safe_transaction
        .clone()
        .context("first envelope carries no proposed transaction")?;
    let chain_id = first.chain_id.context("first envelope carries no chainId")?;
    let mut pending = PendingTransaction::new(
        params,
        SafeDomain::new(chain_id, first.account),
        owners,
        threshold,
    );

    let mut rejected = Vec::new();
    for (index, envelope) in envelopes.iter().enumerate() {
        let Some(sig) = envelope.signature.clone() else {
            continue;
        };
        let signer = sig.signer;
        let outcome = match verify_envelope(envelope) {
            Ok(Some(hash)) if hash == pending.hash() => {
                pending.add_signature(sig).map_err(|e| e.to_string())
            }
            Ok(_) => Err(format!("signed a different transaction than {}", pending.hash())),
            Err(e) => Err(e.to_string()),
        };
        if let Err(reason) = outcome {
            warn!(index, %signer, %reason, "signature rejected");
            rejected.push(json!({ "index": index, "signer": signer, "reason": reason }));
        }
    }

    let signatures = pending.aggregate()?;
    let mut out = json!({
        "safeTransactionHash": pending.hash(),
        "collected": pending.collected(),
        "threshold": pending.threshold(),
        "executable": pending.is_executable(),
        "missingSigners": pending.missing_signers(),
        "rejected": rejected,
        "signatures": signatures,
    });
    if pending.is_executable() {
        out["execCalldata"] = json!(exec_transaction_calldata(pending.params(), signatures));
    }
    pretty(&out)
}

fn envelope(action: EnvelopeCommand) -> Result<String> {
    match action {
        EnvelopeCommand::Encode { json } => {
            let envelope: TransferEnvelope = serde_json::from_str(&read_text(&json)?)
                .context("not a valid envelope JSON document")?;
            Ok(encode_envelope(&envelope)?)
        }
        EnvelopeCommand::Decode { envelope } => pretty(&decode_envelope(&read_text(&envelope)?)?),
        EnvelopeCommand::Verify { envelope } => {
            let envelope = decode_envelope(&read_text(&envelope)?)?;
            let hash = verify_envelope(&envelope)?;
            pretty(&json!({
                "verified": true,
                "safeTransactionHash": hash,
                "signer": envelope.signature.map(|s| s.signer),
            }))
        }
    }
}

async fn template(
    dir: &Path,
    store: &JsonFileStore,
    chain_id: u64,
    action: TemplateCommand,
) -> Result<String> {
    let registry = SpecRegistry::from_dir(dir)?;
    match action {
        TemplateCommand::List => {
            let mut out = String::new();
            for group in registry.groups() {
                out.push_str(&group.name);
                out.push('\n');
                for id in &group.templates {
                    let name = registry.get(id).map(|t| t.name().to_string()).unwrap_or_default();
                    out.push_str(&format!("  {id:<20} {name}\n"));
                }
            }
            Ok(out.trim_end().to_string())
        }
        TemplateCommand::Show { id } => {
            let template = registry
                .get(&id)
                .ok_or_else(|| TemplateError::UnknownTemplate(id.clone()))?;
            pretty(template.spec())
        }
        TemplateCommand::Run {
            id,
            account,
            inputs,
            context,
            draft,
        } => {
            let mut session = registry.open(&id, SafeContext { address: account, chain_id })?;
            for (name, value) in inputs {
                session.set_input(&name, value)?;
            }
            session.refresh(&OfflineChainReader).await;
            for (key, value) in context {
                session.set_context(&key, value);
            }
            let refresh_errors: Vec<String> = session
                .refresh_errors()
                .values()
                .map(|e| format!("{}: {}", e.rule_id, e.message))
                .collect();
            let details: serde_json::Map<String, Value> = session
                .details()
                .into_iter()
                .map(|d| {
                    let value = d.value.unwrap_or_else(|e| format!("<{e}>"));
                    (d.label, Value::String(value))
                })
                .collect();

            let existing = match &draft {
                Some(draft_id) => match store.load_draft(draft_id).await {
                    Ok(record) => Some(record),
                    Err(StoreError::NotFound(_)) => None,
                    Err(e) => return Err(e.into()),
                },
                None => None,
            };
            let mut batch = TransactionBatch::new(account, chain_id);
            for tx in existing.iter().flat_map(|r| r.transactions.iter()) {
                batch.push("draft", tx.clone());
            }

            if let Err(err) = session.finalize_into(&mut batch) {
                if matches!(err, TemplateError::ValidationPending(_)) {
                    let messages: Vec<String> = session
                        .errors()
                        .iter()
                        .flat_map(|(input, errs)| {
                            errs.iter().map(move |e| format!("{input}: {}", e.message))
                        })
                        .collect();
                    bail!("{err}\n{}", messages.join("\n"));
                }
                return Err(err.into());
            }

            if let Some(draft_id) = &draft {
                let now = OffsetDateTime::now_utc();
                store
                    .save_draft(DraftRecord {
                        id: draft_id.clone(),
                        account,
                        chain_id: Some(chain_id),
                        name: existing
                            .as_ref()
                            .map(|r| r.name.clone())
                            .unwrap_or_else(|| draft_id.clone()),
                        transactions: batch.transactions(),
                        created_at: existing.as_ref().map_or(now, |r| r.created_at),
                        updated_at: now,
                    })
                    .await?;
            }

            let added = batch.items().last().map(|i| i.transaction.clone());
            pretty(&json!({
                "transaction": added,
                "details": details,
                "refreshErrors": refresh_errors,
                "draft": draft,
                "envelope": encode_envelope(&batch.to_envelope())?,
            }))
        }
    }
}

async fn draft(store: &JsonFileStore, chain_id: u64, action: DraftCommand) -> Result<String> {
    match action {
        DraftCommand::Save { id, name, envelope } => {
            let envelope = decode_envelope(&read_text(&envelope)?)?;
            let now = OffsetDateTime::now_utc();
            let created_at = match store.load_draft(&id).await {
                Ok(existing) => existing.created_at,
                Err(StoreError::NotFound(_)) => now,
                Err(e) => return Err(e.into()),
            };
            store
                .save_draft(DraftRecord {
                    name: name.unwrap_or_else(|| id.clone()),
                    id: id.clone(),
                    account: envelope.account,
                    chain_id: envelope.chain_id.or(Some(chain_id)),
                    transactions: envelope.transactions,
                    created_at,
                    updated_at: now,
                })
                .await?;
            Ok(format!("saved draft `{id}`"))
        }
        DraftCommand::List {
            account,
            all_chains,
        } => {
            let chain = (!all_chains).then_some(chain_id);
            let lines: Vec<String> = store
                .list_drafts(account, chain)
                .await?
                .into_iter()
                .map(|d| {
                    format!(
                        "{:<16} {:<24} {} {} tx(s) {}",
                        d.id,
                        d.name,
                        d.account,
                        d.transactions.len(),
                        timestamp(d.updated_at)
                    )
                })
                .collect();
            Ok(lines.join("\n"))
        }
        DraftCommand::Show { id } => {
            let record = store.load_draft(&id).await?;
            let envelope =
                TransferEnvelope::new(record.account, record.chain_id, record.transactions.clone());
            pretty(&json!({
                "draft": record,
                "envelope": encode_envelope(&envelope)?,
            }))
        }
        DraftCommand::Delete { id } => {
            store.delete_draft(&id).await?;
            Ok(format!("deleted draft `{id}`"))
        }
    }
}

async fn address_book(
    store: &JsonFileStore,
    chain_id: u64,
    action: AddressBookCommand,
) -> Result<String> {
    match action {
        AddressBookCommand::Add { address, name } => {
            store
                .upsert_entry(AddressBookEntry {
                    address,
                    chain_id,
                    name: name.clone(),
                })
                .await?;
            Ok(format!("{name} = {address} on chain {chain_id}"))
        }
        AddressBookCommand::List { all_chains } => {
            let entries = store.entries((!all_chains).then_some(chain_id)).await?;
            Ok(entries
                .iter()
                .map(|e| format!("{:<24} {} (chain {})", e.name, e.address, e.chain_id))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        AddressBookCommand::Remove { address } => {
            store.remove_entry(address, chain_id).await?;
            Ok(format!("removed {address} on chain {chain_id}"))
        }
    }
}
