use anyhow::Result;
use bstr::{BString, ByteSlice, ByteVec};
use clap::Args;
use rvs_object::Tree;
use rvs_repo::{revparse, Repository};

use super::open_repo;
use crate::Cli;

#[derive(Args)]
pub struct LsTreeArgs {
    /// Recurse into subtrees, printing only blobs with full paths
    #[arg(short = 'r')]
    pub recurse: bool,

    /// Revision whose tree is listed
    pub rev: String,
}

pub fn run(args: &LsTreeArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    let tree_oid = revparse::resolve_to_tree(&repo, &args.rev)?;
    let tree = repo.store().read_tree(&tree_oid)?;
    print_tree(&repo, &tree, b"", args.recurse)?;
    Ok(0)
}

fn print_tree(repo: &Repository, tree: &Tree, prefix: &[u8], recurse: bool) -> Result<()> {
    for entry in tree.iter() {
        let mut path = BString::from(prefix);
        if !path.is_empty() {
            path.push_byte(b'/');
        }
        path.push_str(&entry.name);

        if entry.mode.is_dir() {
            if recurse {
                let sub = repo.store().read_tree(&entry.oid)?;
                print_tree(repo, &sub, &path, recurse)?;
            } else {
                println!("{:06o} tree {}\t{}", entry.mode.raw(), entry.oid.to_hex(), path);
            }
        } else {
            println!("{:06o} blob {}\t{}", entry.mode.raw(), entry.oid.to_hex(), path);
        }
    }
    Ok(())
}
