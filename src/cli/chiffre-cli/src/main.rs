//! Chiffre CLI - Command line interface.

use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chiffre_crypto::{
    CipherAlgorithm, CryptoEngine, HashAlgorithm, KeyDerivationFunction, KeyDerivationOptions,
    PaddingMode,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "chiffre")]
#[command(about = "Chiffre - Symmetric encryption, key derivation and hashing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt Base64 data (reads stdin when no data is given)
    Encrypt {
        /// Cipher algorithm
        #[arg(long, default_value = "AES_256_GCM", env = "CHIFFRE_ALGORITHM")]
        algorithm: CipherAlgorithm,
        /// Padding mode (CBC only)
        #[arg(long, default_value = "PKCS7", env = "CHIFFRE_PADDING")]
        padding: PaddingMode,
        #[command(flatten)]
        key: KeyArgs,
        /// IV or nonce as Base64 (generated when omitted)
        #[arg(long)]
        iv: Option<String>,
        /// Additional authenticated data as Base64 (AEAD only)
        #[arg(long)]
        aad: Option<String>,
        /// Plaintext as Base64
        data: Option<String>,
    },
    /// Decrypt Base64 data (reads stdin when no data is given)
    Decrypt {
        /// Cipher algorithm
        #[arg(long, default_value = "AES_256_GCM", env = "CHIFFRE_ALGORITHM")]
        algorithm: CipherAlgorithm,
        /// Padding mode (CBC only)
        #[arg(long, default_value = "PKCS7", env = "CHIFFRE_PADDING")]
        padding: PaddingMode,
        #[command(flatten)]
        key: KeyArgs,
        /// IV or nonce as Base64
        #[arg(long)]
        iv: String,
        /// Additional authenticated data as Base64 (AEAD only)
        #[arg(long)]
        aad: Option<String>,
        /// Authentication tag as Base64 (AEAD only)
        #[arg(long)]
        tag: Option<String>,
        /// Print the plaintext as UTF-8 text instead of Base64
        #[arg(long)]
        text: bool,
        /// Ciphertext as Base64
        data: Option<String>,
    },
    /// Derive a key from a password
    Derive {
        /// Key derivation function
        #[arg(long, default_value = "PBKDF2")]
        function: KeyDerivationFunction,
        /// JSON file with derivation options (overrides the function preset)
        #[arg(long)]
        options: Option<PathBuf>,
        /// Iteration count, scrypt N or Argon2 time cost
        #[arg(long)]
        iterations: Option<u32>,
        /// Derived key length in bytes
        #[arg(long)]
        key_length: Option<u32>,
        /// Argon2 memory cost in KiB
        #[arg(long)]
        memory: Option<u32>,
        /// scrypt p or Argon2 lanes
        #[arg(long)]
        parallelism: Option<u32>,
        /// Existing salt as Base64 (generated when omitted)
        #[arg(long)]
        salt: Option<String>,
        /// Password (prompted on stdin when omitted)
        #[arg(long, env = "CHIFFRE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Generate random values
    Random {
        #[command(subcommand)]
        command: RandomCommands,
    },
    /// Hash data
    Hash {
        /// Hash algorithm
        #[arg(long, default_value = "SHA256")]
        algorithm: HashAlgorithm,
        /// Treat the input as Base64 instead of UTF-8 text
        #[arg(long)]
        base64: bool,
        /// Input data (reads stdin when omitted)
        data: Option<String>,
    },
    /// Compute an HMAC
    Hmac {
        /// Hash algorithm
        #[arg(long, default_value = "SHA256")]
        algorithm: HashAlgorithm,
        #[command(flatten)]
        key: KeyArgs,
        /// Treat the input as Base64 instead of UTF-8 text
        #[arg(long)]
        base64: bool,
        /// Input data (reads stdin when omitted)
        data: Option<String>,
    },
    /// Show algorithm parameters
    Info {
        /// Algorithm to describe (all when omitted)
        algorithm: Option<CipherAlgorithm>,
    },
}

#[derive(Subcommand)]
enum RandomCommands {
    /// Random bytes
    Bytes {
        /// Number of bytes
        length: usize,
        /// Output hex instead of Base64
        #[arg(long)]
        hex: bool,
    },
    /// Uniform integer in [min, max)
    Int {
        /// Inclusive lower bound
        #[arg(long, default_value = "0")]
        min: u32,
        /// Exclusive upper bound
        #[arg(long)]
        max: u32,
    },
    /// Key sized for an algorithm, as hex
    Key {
        /// Cipher algorithm
        #[arg(long, default_value = "AES_256_GCM", env = "CHIFFRE_ALGORITHM")]
        algorithm: CipherAlgorithm,
    },
}

#[derive(clap::Args)]
struct KeyArgs {
    /// Key material
    #[arg(long, env = "CHIFFRE_KEY", hide_env_values = true)]
    key: String,
    /// Encoding of --key
    #[arg(long, value_enum, default_value = "hex")]
    key_encoding: KeyEncoding,
}

#[derive(Clone, Copy, ValueEnum)]
enum KeyEncoding {
    Hex,
    Base64,
}

// ============================================================================
// Output Types
// ============================================================================

#[derive(Serialize)]
struct EncryptOutput {
    algorithm: String,
    ciphertext: String,
    iv: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
}

#[derive(Serialize)]
struct DeriveOutput {
    function: String,
    key: String,
    salt: String,
}

#[derive(Serialize)]
struct AlgorithmInfo {
    algorithm: String,
    key_size: usize,
    block_size: usize,
    iv_size: usize,
    aead: bool,
    stream: bool,
}

// ============================================================================
// Input Helpers
// ============================================================================

impl KeyArgs {
    fn decode(&self) -> Result<Vec<u8>> {
        let key = match self.key_encoding {
            KeyEncoding::Hex => {
                CryptoEngine::decode_hex(self.key.trim()).context("Invalid hex key")?
            },
            KeyEncoding::Base64 => decode_base64_arg("--key", &self.key)?,
        };
        if key.is_empty() {
            bail!("Key cannot be empty");
        }
        Ok(key)
    }
}

/// Returns `arg`, or all of stdin when it is absent.
fn read_input(arg: Option<String>) -> Result<String> {
    match arg {
        Some(data) => Ok(data),
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            Ok(input.trim_end_matches(['\r', '\n']).to_string())
        },
    }
}

fn decode_base64_arg(name: &str, value: &str) -> Result<Vec<u8>> {
    CryptoEngine::decode_base64_strict(value.trim())
        .with_context(|| format!("Invalid Base64 for {}", name))
}

fn read_password(arg: Option<String>) -> Result<String> {
    let password = match arg {
        Some(p) => p,
        None => {
            eprint!("Password: ");
            io::stderr().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        },
    };

    if password.is_empty() {
        bail!("Password cannot be empty");
    }
    Ok(password)
}

fn load_options(path: &Path) -> Result<KeyDerivationOptions> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read options file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse options file: {}", path.display()))
}

fn preset(function: KeyDerivationFunction) -> KeyDerivationOptions {
    match function {
        KeyDerivationFunction::Pbkdf2 => KeyDerivationOptions::pbkdf2(),
        KeyDerivationFunction::Scrypt => KeyDerivationOptions::scrypt(),
        KeyDerivationFunction::Argon2 => KeyDerivationOptions::argon2(),
    }
}

fn message_bytes(data: Option<String>, base64: bool) -> Result<Vec<u8>> {
    let data = read_input(data)?;
    if base64 {
        decode_base64_arg("data", &data)
    } else {
        Ok(data.into_bytes())
    }
}

// ============================================================================
// Command Handlers
// ============================================================================

fn cmd_encrypt(
    engine: &CryptoEngine,
    algorithm: CipherAlgorithm,
    padding: PaddingMode,
    key: &KeyArgs,
    iv: Option<String>,
    aad: Option<String>,
    data: Option<String>,
) -> Result<()> {
    let key = key.decode()?;
    let plaintext = decode_base64_arg("data", &read_input(data)?)?;
    let iv = iv.map(|v| decode_base64_arg("--iv", &v)).transpose()?;
    let aad = aad.map(|v| decode_base64_arg("--aad", &v)).transpose()?;

    let sealed = engine
        .encrypt(
            &plaintext,
            &key,
            algorithm,
            padding,
            iv.as_deref(),
            aad.as_deref(),
        )
        .context("Encryption failed")?;

    let output = EncryptOutput {
        algorithm: algorithm.to_string(),
        ciphertext: CryptoEngine::encode_base64(&sealed.ciphertext),
        iv: CryptoEngine::encode_base64(&sealed.iv),
        tag: sealed.tag.as_deref().map(CryptoEngine::encode_base64),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_decrypt(
    engine: &CryptoEngine,
    algorithm: CipherAlgorithm,
    padding: PaddingMode,
    key: &KeyArgs,
    iv: &str,
    aad: Option<String>,
    tag: Option<String>,
    text: bool,
    data: Option<String>,
) -> Result<()> {
    let key = key.decode()?;
    let ciphertext = decode_base64_arg("data", &read_input(data)?)?;
    let iv = decode_base64_arg("--iv", iv)?;
    let aad = aad.map(|v| decode_base64_arg("--aad", &v)).transpose()?;
    let tag = tag.map(|v| decode_base64_arg("--tag", &v)).transpose()?;

    let plaintext = engine
        .decrypt(
            &ciphertext,
            &key,
            algorithm,
            &iv,
            padding,
            aad.as_deref(),
            tag.as_deref(),
        )
        .context("Decryption failed")?;

    if text {
        let text = std::str::from_utf8(&plaintext).context("Plaintext is not valid UTF-8")?;
        println!("{}", text);
    } else {
        println!("{}", CryptoEngine::encode_base64(&plaintext));
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_derive(
    engine: &CryptoEngine,
    function: KeyDerivationFunction,
    options_file: Option<&Path>,
    iterations: Option<u32>,
    key_length: Option<u32>,
    memory: Option<u32>,
    parallelism: Option<u32>,
    salt: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let mut options = match options_file {
        Some(path) => load_options(path)?,
        None => preset(function),
    };
    if let Some(iterations) = iterations {
        options.iterations = iterations;
    }
    if let Some(key_length) = key_length {
        options.key_length = key_length;
    }
    if let Some(memory) = memory {
        options.memory = memory;
    }
    if let Some(parallelism) = parallelism {
        options.parallelism = parallelism;
    }

    let password = read_password(password)?;
    tracing::debug!(function = %options.function, "Deriving key");

    let (key, salt) = match salt {
        Some(salt) => {
            let salt = decode_base64_arg("--salt", &salt)?;
            let key = engine
                .derive_key_with_salt(password.as_bytes(), &salt, &options)
                .context("Key derivation failed")?;
            (CryptoEngine::encode_hex(&key), salt)
        },
        None => {
            let derived = engine
                .derive_key(password.as_bytes(), &options)
                .context("Key derivation failed")?;
            (CryptoEngine::encode_hex(derived.key()), derived.salt().to_vec())
        },
    };

    let output = DeriveOutput {
        function: options.function.to_string(),
        key,
        salt: CryptoEngine::encode_base64(&salt),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn cmd_random(engine: &CryptoEngine, command: RandomCommands) -> Result<()> {
    match command {
        RandomCommands::Bytes { length, hex } => {
            let bytes = engine.random_bytes(length)?;
            if hex {
                println!("{}", CryptoEngine::encode_hex(&bytes));
            } else {
                println!("{}", CryptoEngine::encode_base64(&bytes));
            }
        },
        RandomCommands::Int { min, max } => {
            println!("{}", engine.random_int(min, max)?);
        },
        RandomCommands::Key { algorithm } => {
            let key = engine.generate_key(algorithm.key_size())?;
            println!("{}", CryptoEngine::encode_hex(&key));
        },
    }

    Ok(())
}

fn cmd_hash(
    engine: &CryptoEngine,
    algorithm: HashAlgorithm,
    base64: bool,
    data: Option<String>,
) -> Result<()> {
    let data = message_bytes(data, base64)?;
    println!("{}", CryptoEngine::encode_hex(&engine.hash(&data, algorithm)));
    Ok(())
}

fn cmd_hmac(
    engine: &CryptoEngine,
    algorithm: HashAlgorithm,
    key: &KeyArgs,
    base64: bool,
    data: Option<String>,
) -> Result<()> {
    let key = key.decode()?;
    let data = message_bytes(data, base64)?;
    let mac = engine.hmac(&data, &key, algorithm)?;
    println!("{}", CryptoEngine::encode_hex(&mac));
    Ok(())
}

fn cmd_info(algorithm: Option<CipherAlgorithm>) -> Result<()> {
    let algorithms = match algorithm {
        Some(algorithm) => vec![algorithm],
        None => CipherAlgorithm::ALL.to_vec(),
    };

    let info: Vec<AlgorithmInfo> = algorithms
        .into_iter()
        .map(|alg| AlgorithmInfo {
            algorithm: alg.to_string(),
            key_size: alg.key_size(),
            block_size: alg.block_size(),
            iv_size: alg.iv_size(),
            aead: alg.is_aead(),
            stream: alg.is_stream_cipher(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let engine = CryptoEngine::new();

    match cli.command {
        Commands::Encrypt {
            algorithm,
            padding,
            key,
            iv,
            aad,
            data,
        } => cmd_encrypt(&engine, algorithm, padding, &key, iv, aad, data),
        Commands::Decrypt {
            algorithm,
            padding,
            key,
            iv,
            aad,
            tag,
            text,
            data,
        } => cmd_decrypt(&engine, algorithm, padding, &key, &iv, aad, tag, text, data),
        Commands::Derive {
            function,
            options,
            iterations,
            key_length,
            memory,
            parallelism,
            salt,
            password,
        } => cmd_derive(
            &engine,
            function,
            options.as_deref(),
            iterations,
            key_length,
            memory,
            parallelism,
            salt,
            password,
        ),
        Commands::Random { command } => cmd_random(&engine, command),
        Commands::Hash {
            algorithm,
            base64,
            data,
        } => cmd_hash(&engine, algorithm, base64, data),
        Commands::Hmac {
            algorithm,
            key,
            base64,
            data,
        } => cmd_hmac(&engine, algorithm, &key, base64, data),
        Commands::Info { algorithm } => cmd_info(algorithm),
    }
}
