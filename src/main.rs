use clap::{Parser, Subcommand};
use mcmsg::{
    decode_batch,
    transport::{frame_limit, read_frames, write_frame},
    utils::fingerprint,
    CodecConfig, CodecError, CompressionType, DataType, FieldValue, MessageBuilder,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

/// MCMessage命令行工具 - 带类型目录表的紧凑二进制消息
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 将JSON描述的消息打包为消息帧文件
    Pack {
        /// 输入文件路径（JSON格式）
        #[arg(short, long)]
        input: PathBuf,

        /// 输出帧文件路径
        #[arg(short, long)]
        output: PathBuf,

        /// 压缩算法: none, zlib, lz4, zstd, brotli（覆盖配置文件）
        #[arg(short, long)]
        compression: Option<String>,

        /// 配置文件路径（JSON格式）
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// 将消息帧文件解包为JSON
    Unpack {
        /// 输入帧文件路径
        #[arg(short, long)]
        input: PathBuf,

        /// 输出文件路径（JSON格式）
        #[arg(short, long)]
        output: PathBuf,

        /// 压缩算法: none, zlib, lz4, zstd, brotli（覆盖配置文件）
        #[arg(short, long)]
        compression: Option<String>,

        /// 配置文件路径（JSON格式）
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// 查看帧文件信息
    Info {
        /// 帧文件路径
        #[arg(short, long)]
        file: PathBuf,

        /// 压缩算法: none, zlib, lz4, zstd, brotli（覆盖配置文件）
        #[arg(short, long)]
        compression: Option<String>,

        /// 配置文件路径（JSON格式）
        #[arg(long)]
        config: Option<PathBuf>,

        /// 是否输出全部字段
        #[arg(short, long)]
        verbose: bool,
    },
}

/// 命令行JSON文档中的一条消息
#[derive(Debug, Serialize, Deserialize)]
struct MessageDocument {
    id: i64,
    fields: Vec<FieldValue>,
}

/// 输入既可以是单条消息，也可以是消息数组
#[derive(Deserialize)]
#[serde(untagged)]
enum PackInput {
    One(MessageDocument),
    Many(Vec<MessageDocument>),
}

fn main() -> Result<(), CodecError> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Pack {
            input,
            output,
            compression,
            config,
        } => {
            println!("输入文件: {}", input.display());
            println!("输出文件: {}", output.display());

            ensure_exists(input)?;
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let config = load_config(config.as_ref(), compression.as_deref())?;
            println!("压缩算法: {}", config.compression.name());

            match pack_json_to_frames(input, output, &config) {
                Ok(count) => {
                    println!("打包完成: {} 条消息", count);
                    Ok(())
                }
                Err(e) => {
                    eprintln!("打包失败: {}", e);
                    Err(e)
                }
            }
        }

        Commands::Unpack {
            input,
            output,
            compression,
            config,
        } => {
            ensure_exists(input)?;
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let config = load_config(config.as_ref(), compression.as_deref())?;

            println!("解包中...");
            match unpack_frames_to_json(input, output, &config) {
                Ok(count) => {
                    println!("解包完成: {} 条消息 -> {}", count, output.display());
                    Ok(())
                }
                Err(e) => {
                    eprintln!("解包失败: {}", e);
                    Err(e)
                }
            }
        }

        Commands::Info {
            file,
            compression,
            config,
            verbose,
        } => {
            ensure_exists(file)?;
            let config = load_config(config.as_ref(), compression.as_deref())?;

            match print_frame_info(file, &config, *verbose) {
                Ok(_) => Ok(()),
                Err(e) => {
                    eprintln!("获取文件信息失败: {}", e);
                    Err(e)
                }
            }
        }
    }
}

fn ensure_exists(path: &PathBuf) -> Result<(), CodecError> {
    if !path.exists() {
        return Err(CodecError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("文件不存在: {}", path.display()),
        )));
    }
    Ok(())
}

/// 读取配置文件，命令行指定的压缩算法优先
fn load_config(
    path: Option<&PathBuf>,
    compression: Option<&str>,
) -> Result<CodecConfig, CodecError> {
    let mut config = match path {
        Some(path) => CodecConfig::from_json_file(path)?,
        None => CodecConfig::default(),
    };

    if let Some(name) = compression {
        let compression_type: CompressionType = name.parse()?;
        if compression_type != config.compression {
            config.compression = compression_type;
            config.level = None;
        }
    }

    config.validate()?;
    Ok(config)
}

/// 打包JSON消息为帧文件
fn pack_json_to_frames(
    input: &PathBuf,
    output: &PathBuf,
    config: &CodecConfig,
) -> Result<usize, CodecError> {
    let reader = BufReader::new(File::open(input)?);
    let documents = match serde_json::from_reader::<_, PackInput>(reader)? {
        PackInput::One(document) => vec![document],
        PackInput::Many(documents) => documents,
    };

    let mut writer = BufWriter::new(File::create(output)?);
    let mut builder = MessageBuilder::with_config(config.clone());

    for document in &documents {
        builder.clear();
        for field in &document.fields {
            builder.write_value(field)?;
        }
        let message = builder.build(document.id)?;
        write_frame(&mut writer, &message)?;
    }

    writer.flush()?;
    Ok(documents.len())
}

/// 解包帧文件为JSON，字段按类型顺序输出
fn unpack_frames_to_json(
    input: &PathBuf,
    output: &PathBuf,
    config: &CodecConfig,
) -> Result<usize, CodecError> {
    let mut reader = BufReader::new(File::open(input)?);
    let frames = read_frames(&mut reader, frame_limit(config))?;

    let mut documents = Vec::with_capacity(frames.len());
    for result in decode_batch(&frames, config) {
        let mut message = result?;
        documents.push(MessageDocument {
            id: message.id(),
            fields: message.drain()?,
        });
    }

    let writer = BufWriter::new(File::create(output)?);
    serde_json::to_writer_pretty(writer, &documents)?;

    Ok(documents.len())
}

/// 打印帧文件信息
fn print_frame_info(
    file: &PathBuf,
    config: &CodecConfig,
    verbose: bool,
) -> Result<(), CodecError> {
    let mut reader = BufReader::new(File::open(file)?);
    let frames = read_frames(&mut reader, frame_limit(config))?;

    println!("=== 消息帧文件信息 ===");
    println!("文件: {}", file.display());
    println!("压缩算法: {}", config.compression.name());
    println!("消息数量: {}", frames.len());

    for ((id, wire), result) in frames.iter().zip(decode_batch(&frames, config)) {
        println!("\n消息 #{}", id);
        println!("  线上大小: {} 字节", wire.len());
        println!("  SHA-256: {}", fingerprint(wire));

        let mut message = match result {
            Ok(message) => message,
            Err(e) => {
                println!("  解码失败: {}", e);
                continue;
            }
        };

        println!("  载荷大小: {} 字节", message.payload().len());
        println!("  字段总数: {}", message.table().total_entries());
        for data_type in DataType::ALL {
            let count = message.table().len(data_type);
            if count > 0 {
                println!("    {}: {}", data_type.name(), count);
            }
        }

        if verbose {
            println!("  字段:");
            for value in message.drain()? {
                println!("    {}", serde_json::to_string(&value)?);
            }
        }
    }

    Ok(())
}
